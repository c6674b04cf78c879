// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Edge tab session manager: CDP tab fetching, capture-time tab→window
//! assignment, and the layered restore-time replay strategies.

pub mod assign;
pub mod cdp;
pub mod replay;
