// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Save & restore Windows desktop layouts.
//!
//! Schema: `winlayout.v2` (legacy `winlayout.v1` accepted through [`migrate`]).
//!
//! Key behaviours
//!   · Capture filters UWP hosts (ApplicationFrameWindow, TextInputHost,
//!     SystemSettings, …) — they can't be moved or relaunched.
//!   · Minimised windows ARE captured (size filter bypassed for iconic
//!     windows).
//!   · Z-order comes from EnumWindows, which yields top-level windows
//!     front-to-back; restore re-applies it bottom-up so the front-most
//!     window ends up genuinely on top.
//!   · SetWindowPlacement for atomic position + state restore; Aero-Snapped
//!     windows are moved directly so their remembered normal position
//!     survives.
//!   · Matching is pre-filtered by exe; geometry (+30 pts within 40px) is
//!     the primary tiebreaker for identical-title windows.
//!   · Edge profile (--user-data-dir, --profile-directory) is read from the
//!     running process command line at capture and stored per window.
//!   · CDP windowId values of -1/0 mean "unknown window"; tab assignment
//!     falls back to token-overlap title matching, then round-robin.

pub mod capture;
pub mod edge;
pub mod error;
pub mod migrate;
pub mod model;
pub mod placement;
pub mod restore;
pub mod score;
#[cfg(windows)]
pub mod winx;

pub use error::{LayoutError, Result};
pub use migrate::migrate;
pub use model::{EdgeTab, LayoutFile, WindowSnapshotEntry};
pub use restore::{RestoreOptions, SaveOptions, Summary};
#[cfg(windows)]
pub use restore::{capture, restore, save};
