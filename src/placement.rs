// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Placement applier and Z-order restorer.

use crate::model::Rect;

/// Floor for restored window sizes; anything smaller than this came from a
/// corrupt or degenerate rect.
pub const MIN_RESTORE_WIDTH: i32 = 80;
pub const MIN_RESTORE_HEIGHT: i32 = 60;

/// One monitor's full bounds and its work area (minus taskbar).
#[derive(Debug, Clone, Copy)]
pub struct MonitorBounds {
    pub monitor: Rect,
    pub work: Rect,
}

/// Clamp a target rect so it lands on at least one monitor.
///
/// Sizes are floored first. If the rect intersects no monitor at all
/// (a saved multi-monitor layout restored on fewer screens), it is pulled
/// into the primary monitor's work area. `monitors` is primary-first;
/// empty means no display information, in which case the rect passes
/// through untouched.
pub fn clamp_to_monitors(rect: Rect, monitors: &[MonitorBounds]) -> Rect {
    let mut left = rect.left();
    let mut top = rect.top();
    let w = rect.width().max(MIN_RESTORE_WIDTH);
    let h = rect.height().max(MIN_RESTORE_HEIGHT);

    let candidate = Rect::new(left, top, left + w, top + h);
    let on_screen = monitors.iter().any(|m| candidate.intersects(&m.monitor));
    if !monitors.is_empty() && !on_screen {
        let work = monitors[0].work;
        left = left.max(work.left()).min(work.right() - w);
        top = top.max(work.top()).min(work.bottom() - h);
    }
    Rect::new(left, top, left + w, top + h)
}

#[cfg(windows)]
mod os {
    use std::thread;
    use std::time::Duration;

    use tracing::{debug, warn};

    use super::*;
    use crate::error::LayoutError;
    use crate::model::{WindowHandle, WindowSnapshotEntry};
    use crate::winx;

    /// Apply saved position + show state to a window.
    ///
    /// Normal / min / max:
    ///     SetWindowPlacement sets the normal position AND the show state in
    ///     one call; Windows uses the normal position internally to know
    ///     where to restore to, so this is the atomic path.
    ///
    /// Snapped:
    ///     The window is SW_SHOWNORMAL but its position came from Aero Snap,
    ///     which bypasses the normal position entirely. Writing the snapped
    ///     rect through SetWindowPlacement would corrupt the normal position
    ///     and teleport the window on the user's next un-snap. Instead:
    ///     restore non-activating, MoveWindow to the exact snapped rect,
    ///     leave the normal position alone.
    ///
    /// Any failure falls back to restore + move + show as discrete calls.
    /// A handle that is gone (or owned by an elevated process) surfaces as
    /// an error the orchestrator counts as a skip, never a panic.
    pub fn apply_placement(
        handle: WindowHandle,
        entry: &WindowSnapshotEntry,
    ) -> Result<(), LayoutError> {
        let raw = entry.target_rect();
        if !raw.is_valid() {
            return Err(LayoutError::WindowUnreachable {
                handle: handle.raw(),
                reason: "saved rect has no area".into(),
            });
        }
        let rect = clamp_to_monitors(raw, &winx::monitors());

        let primary = if entry.is_snapped {
            winx::show_no_activate(handle);
            winx::move_window(handle, rect)
        } else {
            winx::set_placement(handle, entry.show_cmd, rect)
        };

        match primary {
            Ok(()) => {
                debug!(
                    handle = %handle,
                    state = ?entry.show_cmd,
                    snapped = entry.is_snapped,
                    rect = ?rect,
                    "placement applied"
                );
                Ok(())
            }
            Err(err) => {
                // Discrete fallback: force-restore, move, then show state.
                winx::show_restore(handle);
                thread::sleep(Duration::from_millis(30));
                let moved = winx::move_window(handle, rect);
                winx::show(handle, entry.show_cmd);
                match moved {
                    Ok(()) => {
                        debug!(handle = %handle, "placement applied via fallback");
                        Ok(())
                    }
                    Err(fallback_err) => {
                        warn!(
                            handle = %handle,
                            %err,
                            %fallback_err,
                            "placement failed"
                        );
                        Err(LayoutError::WindowUnreachable {
                            handle: handle.raw(),
                            reason: fallback_err.to_string(),
                        })
                    }
                }
            }
        }
    }

    /// Re-impose saved stacking on successfully placed windows.
    ///
    /// Sorted descending by saved z (background-most first); each
    /// bring-to-top call makes that window topmost, so processing
    /// back-to-front leaves the z=0 window genuinely on top. Flags are
    /// NOMOVE | NOSIZE | NOACTIVATE — geometry already settled and must
    /// not be disturbed here.
    pub fn restore_z_order(placed: &[(WindowHandle, u32)]) -> usize {
        let mut ordered: Vec<&(WindowHandle, u32)> = placed.iter().collect();
        ordered.sort_by_key(|(_, z)| std::cmp::Reverse(*z));
        let mut restored = 0;
        for (handle, z) in ordered {
            match winx::bring_to_top(*handle) {
                Ok(()) => {
                    debug!(handle = %handle, z, "z-order restored");
                    restored += 1;
                }
                Err(err) => {
                    warn!(handle = %handle, z, %err, "z-order restore failed");
                }
            }
        }
        restored
    }
}

#[cfg(windows)]
pub use os::{apply_placement, restore_z_order};

#[cfg(test)]
mod tests {
    use super::*;

    fn single_monitor() -> Vec<MonitorBounds> {
        vec![MonitorBounds {
            monitor: Rect::new(0, 0, 1920, 1080),
            work: Rect::new(0, 0, 1920, 1040),
        }]
    }

    #[test]
    fn on_screen_rect_is_untouched() {
        let r = Rect::new(100, 100, 900, 700);
        assert_eq!(clamp_to_monitors(r, &single_monitor()), r);
    }

    #[test]
    fn partially_visible_rect_is_untouched() {
        // Still intersects the monitor; the user may want it hanging off.
        let r = Rect::new(1800, 900, 2600, 1500);
        assert_eq!(clamp_to_monitors(r, &single_monitor()), r);
    }

    #[test]
    fn fully_offscreen_rect_lands_in_primary_work_area() {
        let r = Rect::new(-3000, 200, -2200, 800);
        let clamped = clamp_to_monitors(r, &single_monitor());
        let work = single_monitor()[0].work;
        assert!(clamped.intersects(&work));
        assert_eq!(clamped.width(), 800);
        assert_eq!(clamped.height(), 600);
        assert!(clamped.left() >= work.left());
        assert!(clamped.bottom() <= work.bottom());
    }

    #[test]
    fn offscreen_on_second_monitor_stays_when_monitor_exists() {
        let mut monitors = single_monitor();
        monitors.push(MonitorBounds {
            monitor: Rect::new(1920, 0, 3840, 1080),
            work: Rect::new(1920, 0, 3840, 1040),
        });
        let r = Rect::new(2000, 100, 2800, 700);
        assert_eq!(clamp_to_monitors(r, &monitors), r);
    }

    #[test]
    fn degenerate_sizes_are_floored() {
        let r = Rect::new(100, 100, 110, 105);
        let clamped = clamp_to_monitors(r, &single_monitor());
        assert_eq!(clamped.width(), MIN_RESTORE_WIDTH);
        assert_eq!(clamped.height(), MIN_RESTORE_HEIGHT);
    }

    #[test]
    fn no_monitor_info_passes_through() {
        let r = Rect::new(-5000, -5000, -4000, -4500);
        let clamped = clamp_to_monitors(r, &[]);
        assert_eq!(clamped.left(), -5000);
    }
}
