// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;

use thiserror::Error;

/// Error taxonomy for capture/restore.
///
/// Only the file-level errors ([`LayoutError::NotFound`], [`LayoutError::Io`],
/// [`LayoutError::Json`], [`LayoutError::SchemaUnsupported`],
/// [`LayoutError::Malformed`]) abort a run. Everything else is recovered
/// where it occurs: an unreachable window becomes a skip, a failed launch
/// leaves the target missing, a dead debug endpoint falls through the
/// tab-replay chain.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("layout file not found: {0}")]
    NotFound(PathBuf),

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("unrecognised layout schema {found:?} (expected {expected:?}); re-save the layout with the current tool")]
    SchemaUnsupported { found: String, expected: String },

    #[error("malformed layout: {0}")]
    Malformed(String),

    #[error("window 0x{handle:X} unreachable: {reason}")]
    WindowUnreachable { handle: isize, reason: String },

    #[error("could not launch {exe}: {reason}")]
    LaunchFailed { exe: String, reason: String },

    #[error("no debug endpoint reachable on port {0}")]
    ProtocolUnreachable(u16),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
