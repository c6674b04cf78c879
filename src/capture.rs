// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Window snapshot capturer: enumeration, admission filter, snap detection,
//! Edge profile detection.
//!
//! The admission filter is a pure function over a [`WindowProbe`] so the
//! whole reject matrix is testable without a desktop session.

use crate::model::{Rect, ShowState};

/// Processes that appear as visible top-level windows but cannot be
/// meaningfully captured, repositioned, or relaunched.
pub const BLOCKED_PROCESSES: &[&str] = &[
    "textinputhost.exe",        // Windows Input Experience
    "applicationframehost.exe", // UWP shell host
    "shellhost.exe",
    "startmenuexperiencehost.exe",
    "searchhost.exe",
    "searchapp.exe",
    "lockapp.exe",
    "systemsettings.exe", // Settings UWP
    "dwm.exe",
    "fontdrvhost.exe",
    "rtkuwp.exe", // Realtek Audio Console UWP
];

/// Window classes that are always noise.
pub const BLOCKED_CLASSES: &[&str] = &[
    "windows.ui.core.corewindow", // UWP content host
    "applicationframewindow",     // UWP shell chrome
    "progman",                    // desktop
    "workerw",                    // desktop icon layer
];

/// Anything narrower/shorter than this is a popup or splash, not a window
/// worth restoring. Minimised windows bypass the check (their live rect is
/// near-zero).
pub const MIN_WIDTH: i32 = 120;
pub const MIN_HEIGHT: i32 = 80;

/// Live rect may drift from the remembered normal rect by this much before
/// a normal-state window counts as snapped.
pub const SNAP_TOLERANCE: i32 = 10;

pub fn is_blocked_process(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    BLOCKED_PROCESSES.contains(&lower.as_str())
}

pub fn is_blocked_class(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    BLOCKED_CLASSES.contains(&lower.as_str())
}

/// Everything the admission filter needs to know about one window.
#[derive(Debug, Clone, Default)]
pub struct WindowProbe {
    pub has_parent: bool,
    pub visible: bool,
    pub title: String,
    pub class_name: String,
    pub process_name: String,
    /// WS_EX_TOOLWINDOW set.
    pub tool_window: bool,
    /// WS_EX_APPWINDOW set.
    pub app_window: bool,
    pub has_owner: bool,
    pub minimized: bool,
    pub rect: Rect,
}

/// True for top-level user-facing windows we can meaningfully save.
pub fn admits(probe: &WindowProbe) -> bool {
    if probe.has_parent || !probe.visible {
        return false;
    }
    if probe.title.trim().is_empty() {
        return false;
    }
    if is_blocked_class(probe.class_name.trim()) {
        return false;
    }
    if probe.tool_window && !probe.app_window {
        return false;
    }
    if probe.has_owner && !probe.app_window {
        return false;
    }
    if is_blocked_process(&probe.process_name) {
        return false;
    }
    // Minimised windows report a near-zero live rect and must still pass.
    if !probe.minimized && (probe.rect.width() < MIN_WIDTH || probe.rect.height() < MIN_HEIGHT) {
        return false;
    }
    true
}

/// Snapped: show state is normal but Aero Snap moved the window without
/// updating the remembered normal position.
pub fn is_snapped(show_cmd: ShowState, live_rect: &Rect, normal_rect: &Rect) -> bool {
    if show_cmd != ShowState::Normal {
        return false;
    }
    !live_rect.close_to(normal_rect, SNAP_TOLERANCE)
}

// ── Edge profile detection ──────────────────────────

/// `--user-data-dir` / `--profile-directory`, as parsed from a running
/// Edge command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeProfile {
    pub user_data_dir: String,
    pub profile_directory: String,
}

/// Split a raw Win32 command line into arguments. Quote handling only —
/// no escape processing, which matches how browser flags are spelled.
fn split_command_line(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for ch in raw.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

fn looks_like_profile_dir(tail: &str) -> bool {
    if tail.eq_ignore_ascii_case("default") {
        return true;
    }
    let lower = tail.to_ascii_lowercase();
    match lower.strip_prefix("profile ") {
        Some(rest) => !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}

/// Parse profile flags from a command line. A standard install carries
/// neither flag; the caller fills in the default User Data path and
/// `Default` profile.
pub fn edge_profile_from_cmdline(cmdline: &str) -> EdgeProfile {
    let mut profile = EdgeProfile::default();
    for arg in split_command_line(cmdline) {
        if let Some(v) = arg.strip_prefix("--user-data-dir=") {
            profile.user_data_dir = v.to_string();
        } else if let Some(v) = arg.strip_prefix("--profile-directory=") {
            profile.profile_directory = v.to_string();
        }
    }
    // No explicit profile flag: some debug sessions point --user-data-dir
    // straight at a profile folder — recognise that from the path tail.
    if profile.profile_directory.is_empty() && !profile.user_data_dir.is_empty() {
        let trimmed = profile.user_data_dir.trim_end_matches(['\\', '/']);
        let tail = trimmed
            .rsplit(['\\', '/'])
            .next()
            .unwrap_or(trimmed);
        if looks_like_profile_dir(tail) {
            profile.profile_directory = tail.to_string();
        }
    }
    profile
}

/// `%LOCALAPPDATA%\Microsoft\Edge\User Data` — where a normal (non-debug)
/// Edge keeps its sessions.
pub fn default_edge_user_data_dir() -> String {
    let base = std::env::var("LOCALAPPDATA").unwrap_or_default();
    if base.is_empty() {
        return String::new();
    }
    format!("{base}\\Microsoft\\Edge\\User Data")
}

/// Profile with defaults applied for a normal install.
pub fn resolve_edge_profile(cmdline: Option<&str>) -> EdgeProfile {
    let mut profile = cmdline.map(edge_profile_from_cmdline).unwrap_or_default();
    if profile.user_data_dir.is_empty() {
        profile.user_data_dir = default_edge_user_data_dir();
    }
    if profile.profile_directory.is_empty() {
        profile.profile_directory = "Default".to_string();
    }
    profile
}

// ── Win32-backed capture ────────────────────────────

#[cfg(windows)]
mod os {
    use tracing::debug;
    use uuid::Uuid;

    use super::*;
    use crate::model::{EdgeMeta, LaunchSpec, LiveWindow, WindowSnapshotEntry};
    use crate::winx;

    /// Capture every restorable top-level window, front-to-back.
    ///
    /// EnumWindows yields top-level windows in Z order, so the enumeration
    /// index doubles as the saved `z_order` — no separate window-manager
    /// list walk, which would surface invisible handles that never match
    /// the enumeration.
    pub fn capture_windows() -> Vec<WindowSnapshotEntry> {
        let mut entries = Vec::new();
        for (z_index, handle) in winx::enumerate_top_level().iter().enumerate() {
            let handle = *handle;
            let pid = winx::window_pid(handle);
            let (process_name, exe) = winx::process_image(pid);
            let probe = WindowProbe {
                has_parent: winx::has_parent(handle),
                visible: winx::is_visible(handle),
                title: winx::window_title(handle),
                class_name: winx::window_class(handle),
                process_name: process_name.clone(),
                tool_window: winx::is_tool_window(handle),
                app_window: winx::is_app_window(handle),
                has_owner: winx::has_owner(handle),
                minimized: winx::is_minimized(handle),
                rect: winx::window_rect(handle),
            };
            if !admits(&probe) {
                continue;
            }

            let rect = probe.rect;
            let (show_cmd, normal_rect) = winx::placement(handle);
            let snapped = is_snapped(show_cmd, &rect, &normal_rect);
            // For snapped windows the live rect IS the layout; the rect
            // Windows remembers internally is the pre-snap position.
            let restore_rect = if snapped { rect } else { normal_rect };

            let mut entry = WindowSnapshotEntry {
                window_id: Uuid::new_v4().to_string(),
                title: probe.title.trim().to_string(),
                class_name: probe.class_name.trim().to_string(),
                pid,
                process_name,
                exe: exe.clone(),
                is_visible: true,
                is_minimized: show_cmd == ShowState::Minimized,
                is_maximized: show_cmd == ShowState::Maximized,
                is_snapped: snapped,
                rect,
                normal_rect,
                restore_rect,
                show_cmd,
                z_order: z_index as u32,
                ..Default::default()
            };

            if !exe.is_empty() {
                entry.launch = Some(LaunchSpec {
                    exe,
                    args: Vec::new(),
                    cwd: String::new(),
                });
            }

            if entry.is_edge() {
                let cmdline = winx::process_command_line(pid);
                let profile = resolve_edge_profile(cmdline.as_deref());
                entry.edge = Some(EdgeMeta {
                    user_data_dir: profile.user_data_dir,
                    profile_directory: profile.profile_directory,
                    cdp_window_id: 0,
                    debug_port: 0,
                });
            }

            debug!(
                z = entry.z_order,
                process = %entry.process_name,
                title = %entry.title,
                snapped = entry.is_snapped,
                "captured window"
            );
            entries.push(entry);
        }
        entries
    }

    /// Enumerate current top-level windows for restore matching. Lighter
    /// filter than capture: the size and tool-window checks stay off so a
    /// saved window that shrank or re-flagged itself can still be found.
    pub fn live_windows() -> Vec<LiveWindow> {
        let mut out = Vec::new();
        for (z_index, handle) in winx::enumerate_top_level().iter().enumerate() {
            let handle = *handle;
            if !winx::is_window(handle) || winx::has_parent(handle) || !winx::is_visible(handle) {
                continue;
            }
            let title = winx::window_title(handle);
            if title.trim().is_empty() {
                continue;
            }
            let class_name = winx::window_class(handle);
            if is_blocked_class(class_name.trim()) {
                continue;
            }
            let pid = winx::window_pid(handle);
            let (process_name, exe) = winx::process_image(pid);
            if is_blocked_process(&process_name) {
                continue;
            }
            let (show_cmd, normal_rect) = winx::placement(handle);
            out.push(LiveWindow {
                handle,
                title: title.trim().to_string(),
                class_name: class_name.trim().to_string(),
                pid,
                process_name,
                exe,
                show_cmd,
                rect: winx::window_rect(handle),
                normal_rect,
                z_order: z_index as u32,
            });
        }
        out
    }
}

#[cfg(windows)]
pub use os::{capture_windows, live_windows};

#[cfg(test)]
mod tests {
    use super::*;

    fn good_probe() -> WindowProbe {
        WindowProbe {
            has_parent: false,
            visible: true,
            title: "Untitled - Notepad".into(),
            class_name: "Notepad".into(),
            process_name: "notepad.exe".into(),
            tool_window: false,
            app_window: false,
            has_owner: false,
            minimized: false,
            rect: Rect::new(100, 100, 900, 700),
        }
    }

    #[test]
    fn admits_a_plain_window() {
        assert!(admits(&good_probe()));
    }

    #[test]
    fn rejects_child_invisible_and_untitled() {
        let mut p = good_probe();
        p.has_parent = true;
        assert!(!admits(&p));

        let mut p = good_probe();
        p.visible = false;
        assert!(!admits(&p));

        let mut p = good_probe();
        p.title = "   ".into();
        assert!(!admits(&p));
    }

    #[test]
    fn rejects_blocked_class_and_process() {
        let mut p = good_probe();
        p.class_name = "ApplicationFrameWindow".into();
        assert!(!admits(&p));

        let mut p = good_probe();
        p.process_name = "TextInputHost.exe".into();
        assert!(!admits(&p));
    }

    #[test]
    fn rejects_tool_and_owned_windows_without_app_flag() {
        let mut p = good_probe();
        p.tool_window = true;
        assert!(!admits(&p));
        p.app_window = true;
        assert!(admits(&p));

        let mut p = good_probe();
        p.has_owner = true;
        assert!(!admits(&p));
        p.app_window = true;
        assert!(admits(&p));
    }

    #[test]
    fn rejects_tiny_windows_unless_minimized() {
        let mut p = good_probe();
        p.rect = Rect::new(0, 0, 119, 200);
        assert!(!admits(&p));
        p.rect = Rect::new(0, 0, 200, 79);
        assert!(!admits(&p));

        // Minimised bypass: iconic windows report a near-zero rect.
        p.minimized = true;
        p.rect = Rect::new(-32000, -32000, -31840, -31972);
        assert!(admits(&p));
    }

    #[test]
    fn snap_detection_only_applies_to_normal_state() {
        let live = Rect::new(0, 0, 960, 1040);
        let normal = Rect::new(200, 150, 1000, 750);
        assert!(is_snapped(ShowState::Normal, &live, &normal));
        assert!(!is_snapped(ShowState::Maximized, &live, &normal));
        assert!(!is_snapped(ShowState::Minimized, &live, &normal));
        // Within tolerance: not snapped.
        let close = Rect::new(205, 145, 1005, 755);
        assert!(!is_snapped(ShowState::Normal, &close, &normal));
    }

    #[test]
    fn edge_profile_parses_flags() {
        let p = edge_profile_from_cmdline(
            r#""C:\Program Files\msedge.exe" --user-data-dir=C:\Temp\edge-debug --profile-directory="Profile 2" --no-first-run"#,
        );
        assert_eq!(p.user_data_dir, r"C:\Temp\edge-debug");
        assert_eq!(p.profile_directory, "Profile 2");
    }

    #[test]
    fn edge_profile_derives_from_udd_tail() {
        let p = edge_profile_from_cmdline(r"msedge.exe --user-data-dir=D:\Sessions\Profile 3\");
        assert_eq!(p.profile_directory, "Profile 3");

        let p = edge_profile_from_cmdline(r"msedge.exe --user-data-dir=D:\Sessions\scratch");
        assert_eq!(p.profile_directory, "");
    }

    #[test]
    fn edge_profile_defaults_for_plain_install() {
        let p = resolve_edge_profile(Some("msedge.exe"));
        assert_eq!(p.profile_directory, "Default");
        let p = resolve_edge_profile(None);
        assert_eq!(p.profile_directory, "Default");
    }
}
