// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Data model for layout files and transient restore-side records.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LayoutError, Result};

/// Current layout schema string.
pub const SCHEMA: &str = "winlayout.v2";
/// Legacy schema accepted only through `migrate`.
pub const SCHEMA_V1: &str = "winlayout.v1";

/// Z index for windows that never showed up in the enumeration (sorts last).
pub const Z_SENTINEL: u32 = 9999;

/// Top-level keys written by the GUI shell that save must round-trip
/// untouched.
pub const PRESERVED_KEYS: &[&str] = &["speed_menu", "custom_layout_folders", "layouts_root"];

// ── Geometry ────────────────────────────────────────

/// Screen rect as `[left, top, right, bottom]`, matching the layout file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rect(pub [i32; 4]);

impl Rect {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Rect([left, top, right, bottom])
    }

    pub fn left(&self) -> i32 {
        self.0[0]
    }
    pub fn top(&self) -> i32 {
        self.0[1]
    }
    pub fn right(&self) -> i32 {
        self.0[2]
    }
    pub fn bottom(&self) -> i32 {
        self.0[3]
    }
    pub fn width(&self) -> i32 {
        self.right() - self.left()
    }
    pub fn height(&self) -> i32 {
        self.bottom() - self.top()
    }

    /// A rect is usable once it spans actual area.
    pub fn is_valid(&self) -> bool {
        self.width() > 0 && self.height() > 0
    }

    /// All four edges within `tolerance` px of `other`.
    pub fn close_to(&self, other: &Rect, tolerance: i32) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.right() <= other.left()
            || self.left() >= other.right()
            || self.bottom() <= other.top()
            || self.top() >= other.bottom())
    }
}

// ── Show state ──────────────────────────────────────

/// Window display mode. Serialised as the raw Win32 `showCmd` value
/// (1/2/3) so layout files stay byte-compatible; anything unrecognised
/// decodes as normal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum ShowState {
    #[default]
    Normal,
    Minimized,
    Maximized,
}

impl From<u32> for ShowState {
    fn from(show_cmd: u32) -> Self {
        match show_cmd {
            2 => ShowState::Minimized,
            3 => ShowState::Maximized,
            _ => ShowState::Normal,
        }
    }
}

impl From<ShowState> for u32 {
    fn from(state: ShowState) -> u32 {
        match state {
            ShowState::Normal => 1,
            ShowState::Minimized => 2,
            ShowState::Maximized => 3,
        }
    }
}

// ── Window handles ──────────────────────────────────

/// Opaque, non-owning reference to a live top-level window.
///
/// Only valid for the current OS session; may be invalidated at any time,
/// so every OS call made through one treats failure as a normal outcome.
/// Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn raw(self) -> isize {
        self.0
    }
}

impl std::fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

// ── Persisted records ───────────────────────────────

/// How to start the owning process again if it is missing at restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaunchSpec {
    #[serde(default)]
    pub exe: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub cwd: String,
}

/// Edge session metadata, captured from the running process command line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EdgeMeta {
    #[serde(default)]
    pub user_data_dir: String,
    #[serde(default)]
    pub profile_directory: String,
    /// CDP window id hint recorded at tab capture; 0 = unknown.
    #[serde(default)]
    pub cdp_window_id: i64,
    /// Debug port the tabs were captured from; 0 = none.
    #[serde(default)]
    pub debug_port: u16,
}

/// A saved browser tab. `url` is required and non-empty; `title` may be
/// empty (it is only a matching hint).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeTab {
    #[serde(default)]
    pub title: String,
    pub url: String,
}

/// One captured window. Created once at capture, immutable input during
/// restore.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WindowSnapshotEntry {
    /// Stable synthetic id, assigned at capture, never recomputed.
    #[serde(default)]
    pub window_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub class_name: String,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub process_name: String,
    #[serde(default)]
    pub exe: String,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_minimized: bool,
    #[serde(default)]
    pub is_maximized: bool,
    /// show_cmd was normal but the live rect disagreed with the remembered
    /// normal rect — the Aero Snap signature.
    #[serde(default)]
    pub is_snapped: bool,
    /// Live screen rect at capture time.
    #[serde(default)]
    pub rect: Rect,
    /// OS-remembered restore rect from GetWindowPlacement.
    #[serde(default)]
    pub normal_rect: Rect,
    /// The rect actually written back: `rect` if snapped, else `normal_rect`.
    #[serde(default)]
    pub restore_rect: Rect,
    #[serde(default)]
    pub show_cmd: ShowState,
    /// 0 = frontmost at capture.
    #[serde(default = "default_z")]
    pub z_order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch: Option<LaunchSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_tabs: Vec<EdgeTab>,
    /// Per-entry opt-in for destructive restore (close + clean relaunch).
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub destructive: bool,
}

fn default_true() -> bool {
    true
}

fn default_z() -> u32 {
    Z_SENTINEL
}

impl WindowSnapshotEntry {
    pub fn is_edge(&self) -> bool {
        self.process_name.eq_ignore_ascii_case(crate::score::EDGE_PROCESS)
    }

    /// The rect placement writes back, with fallbacks for hand-edited files.
    pub fn target_rect(&self) -> Rect {
        if self.restore_rect.is_valid() {
            self.restore_rect
        } else if self.rect.is_valid() {
            self.rect
        } else {
            self.normal_rect
        }
    }

    /// The rect scoring compares against (pre-snap geometry).
    pub fn anchor_rect(&self) -> Rect {
        if self.normal_rect.is_valid() {
            self.normal_rect
        } else {
            self.rect
        }
    }
}

/// Transient restore-side view of a live window. Never persisted.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    pub handle: WindowHandle,
    pub title: String,
    pub class_name: String,
    pub pid: u32,
    pub process_name: String,
    pub exe: String,
    pub show_cmd: ShowState,
    pub rect: Rect,
    pub normal_rect: Rect,
    pub z_order: u32,
}

impl LiveWindow {
    pub fn anchor_rect(&self) -> Rect {
        if self.normal_rect.is_valid() {
            self.normal_rect
        } else {
            self.rect
        }
    }
}

// ── Layout file ─────────────────────────────────────

/// The persisted artifact. `preserved` flattens any caller metadata
/// (speed-menu config, layout roots) so it round-trips untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutFile {
    pub schema: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub windows: Vec<WindowSnapshotEntry>,
    #[serde(flatten)]
    pub preserved: serde_json::Map<String, serde_json::Value>,
}

impl LayoutFile {
    pub fn new(windows: Vec<WindowSnapshotEntry>) -> Self {
        LayoutFile {
            schema: SCHEMA.to_string(),
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            windows,
            preserved: serde_json::Map::new(),
        }
    }
}

/// Read a layout file as raw JSON (schema checks happen in `migrate`).
pub fn read_layout_value(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LayoutError::NotFound(path.to_path_buf())
        } else {
            LayoutError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    serde_json::from_str(&text).map_err(|e| LayoutError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Write a layout atomically: temp file in the same directory, then rename
/// over the destination, so a crash never leaves a partial file.
pub fn write_layout_value(path: &Path, value: &serde_json::Value) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir).map_err(|e| LayoutError::Io {
                path: dir.to_path_buf(),
                source: e,
            })?;
        }
    }
    let json = serde_json::to_string_pretty(value).map_err(|e| LayoutError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "layout.json".to_string());
    tmp_name.push_str(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, json).map_err(|e| LayoutError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    fs::rename(&tmp, path).map_err(|e| LayoutError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn write_layout(path: &Path, layout: &LayoutFile) -> Result<()> {
    let value = serde_json::to_value(layout).map_err(|e| LayoutError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    write_layout_value(path, &value)
}

/// Pick out the caller metadata an existing file carries so a re-save
/// keeps it. Unreadable or foreign files preserve nothing.
pub fn load_preserved(path: &Path) -> serde_json::Map<String, serde_json::Value> {
    let mut kept = serde_json::Map::new();
    let Ok(value) = read_layout_value(path) else {
        return kept;
    };
    if let Some(obj) = value.as_object() {
        for key in PRESERVED_KEYS {
            if let Some(v) = obj.get(*key) {
                kept.insert((*key).to_string(), v.clone());
            }
        }
    }
    kept
}
