// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Restore orchestrator: match → place → launch missing → stabilize →
//! re-order z → replay tabs.
//!
//! Nothing in here aborts the run for a single window: every per-window
//! failure degrades to a skip, because the point of a restore is
//! best-effort convergence, not an all-or-nothing transaction. The only
//! fatal conditions are an unreadable/unparsable file or an unrecognised
//! schema.
//!
//! These entry points are the whole contract for external collaborators
//! (GUI shell, hotkey listener): one exclusive invocation per save or
//! restore. A hotkey listener must spawn a fresh process per trigger,
//! never call back into a live one.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::model::{LiveWindow, WindowHandle, WindowSnapshotEntry};
use crate::score::{self, DEFAULT_MIN_SCORE};

#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Capture Edge tabs from a live debug endpoint.
    pub edge_tabs: bool,
    pub debug_port: u16,
}

impl Default for SaveOptions {
    fn default() -> Self {
        SaveOptions {
            edge_tabs: false,
            debug_port: crate::edge::cdp::DEFAULT_DEBUG_PORT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Start applications whose windows are missing, then re-match once.
    pub launch_missing: bool,
    /// Replay saved Edge tabs.
    pub edge_tabs: bool,
    /// Close matched windows flagged `destructive` and relaunch them clean.
    pub destructive: bool,
    /// Log the top-N ranked candidates per target.
    pub diagnostics: bool,
    pub diagnostics_top: usize,
    /// Minimum match score before a target counts as found.
    pub min_score: i32,
    /// How long launched applications get to put up their windows.
    pub settle_wait: Duration,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        RestoreOptions {
            launch_missing: false,
            edge_tabs: false,
            destructive: false,
            diagnostics: false,
            diagnostics_top: 3,
            min_score: DEFAULT_MIN_SCORE,
            settle_wait: Duration::from_secs(6),
        }
    }
}

/// Per-run outcome counters.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    pub mode: String,
    pub applied: usize,
    pub skipped: usize,
    pub total: usize,
    pub closed: usize,
    pub launched: usize,
    pub z_restored: usize,
    pub edge_tabs_opened: usize,
    pub edge_size_fixes: usize,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Restore complete ({}). Applied={}, Skipped={}, Total={}, Closed={}, \
             Launched={}, ZOrder={}, EdgeTabs={}, EdgeSizeFixes={}",
            if self.mode.is_empty() { "basic" } else { &self.mode },
            self.applied,
            self.skipped,
            self.total,
            self.closed,
            self.launched,
            self.z_restored,
            self.edge_tabs_opened,
            self.edge_size_fixes,
        )
    }
}

/// Result of one greedy matching pass.
#[derive(Debug, Clone, Default)]
pub struct MatchOutcome {
    /// (target index, claimed live handle), in target order.
    pub assignments: Vec<(usize, WindowHandle)>,
    /// Target indices with no acceptable candidate.
    pub missing: Vec<usize>,
}

/// Greedy per-target assignment over `indices`, in order.
///
/// Saved order is z order, so the frontmost saved windows claim their
/// candidates first; a claimed handle can never be claimed again. Not a
/// global optimum — ties are decided by processing order, which is exactly
/// what makes the outcome reproducible.
pub fn match_targets(
    targets: &[WindowSnapshotEntry],
    indices: &[usize],
    live: &[LiveWindow],
    min_score: i32,
    used: &mut HashSet<WindowHandle>,
    diagnostics_top: Option<usize>,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    for &idx in indices {
        let target = &targets[idx];
        let ranked = score::rank_candidates(target, live, used);
        if let Some(top_n) = diagnostics_top {
            score::log_diagnostics(target, &ranked, top_n);
        }
        match ranked.first() {
            Some(best) if best.breakdown.total >= min_score => {
                used.insert(best.window.handle);
                outcome.assignments.push((idx, best.window.handle));
            }
            _ => outcome.missing.push(idx),
        }
    }
    outcome
}

#[cfg(windows)]
mod os {
    use std::collections::HashMap;
    use std::path::Path;
    use std::process::Command;
    use std::thread;

    use tracing::{debug, info, warn};

    use super::*;
    use crate::capture::{self, is_blocked_class, is_blocked_process};
    use crate::edge::{assign, cdp, replay};
    use crate::error::{LayoutError, Result};
    use crate::migrate::migrate;
    use crate::model::{self, LayoutFile};
    use crate::placement;
    use crate::winx;

    /// Build a snapshot of every restorable window, front-to-back.
    pub fn capture() -> Vec<WindowSnapshotEntry> {
        capture::capture_windows()
    }

    #[derive(Debug, Clone, Copy)]
    pub struct SaveReport {
        pub windows: usize,
        pub edge_tabs: usize,
    }

    /// Capture the desktop and write it to `path`, keeping any caller
    /// metadata an existing file carries.
    pub fn save(path: &Path, opts: &SaveOptions) -> Result<SaveReport> {
        let mut windows = capture();

        if opts.edge_tabs {
            if cdp::endpoint_alive(opts.debug_port) {
                match cdp::fetch_tabs(opts.debug_port) {
                    Ok(tabs) => {
                        let mut edge_wins: Vec<&mut WindowSnapshotEntry> =
                            windows.iter_mut().filter(|w| w.is_edge()).collect();
                        assign::assign_tabs(&mut edge_wins, &tabs);
                        for w in edge_wins {
                            if !w.edge_tabs.is_empty() {
                                if let Some(meta) = &mut w.edge {
                                    meta.debug_port = opts.debug_port;
                                }
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Edge tab capture failed"),
                }
            } else {
                warn!(
                    port = opts.debug_port,
                    "no Edge debug endpoint; run 'winlayout edge-debug' first"
                );
            }
        }

        let tab_count = windows.iter().map(|w| w.edge_tabs.len()).sum();
        let window_count = windows.len();
        let mut layout = LayoutFile::new(windows);
        layout.preserved = model::load_preserved(path);
        model::write_layout(path, &layout)?;
        info!(windows = window_count, edge_tabs = tab_count, path = %path.display(), "layout saved");
        Ok(SaveReport {
            windows: window_count,
            edge_tabs: tab_count,
        })
    }

    fn launch_target(target: &WindowSnapshotEntry) -> bool {
        let (exe, args, cwd) = match &target.launch {
            Some(spec) if !spec.exe.trim().is_empty() => {
                (spec.exe.trim().to_string(), spec.args.clone(), spec.cwd.trim().to_string())
            }
            _ => (target.exe.trim().to_string(), Vec::new(), String::new()),
        };
        if exe.is_empty() {
            return false;
        }
        let file_name = Path::new(&exe)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_blocked_process(&file_name) {
            return false;
        }
        if !Path::new(&exe).exists() {
            warn!(%exe, "launch target does not exist");
            return false;
        }
        let mut cmd = Command::new(&exe);
        cmd.args(&args);
        if !cwd.is_empty() {
            cmd.current_dir(&cwd);
        }
        match cmd.spawn() {
            Ok(_) => {
                debug!(%exe, "launched missing application");
                true
            }
            Err(e) => {
                let err = LayoutError::LaunchFailed {
                    exe,
                    reason: e.to_string(),
                };
                warn!(%err, "launch failed");
                false
            }
        }
    }

    fn place_matched(
        targets: &[WindowSnapshotEntry],
        idx: usize,
        handle: WindowHandle,
        summary: &mut Summary,
        placed_z: &mut Vec<(WindowHandle, u32)>,
        edge_applied: &mut HashMap<usize, WindowHandle>,
    ) {
        let target = &targets[idx];
        match placement::apply_placement(handle, target) {
            Ok(()) => {
                summary.applied += 1;
                placed_z.push((handle, target.z_order));
                if target.is_edge() {
                    edge_applied.insert(idx, handle);
                }
            }
            Err(err) => {
                warn!(handle = %handle, title = %target.title, %err, "placement skipped");
                summary.skipped += 1;
            }
        }
    }

    /// Reconcile the live desktop against a saved layout.
    ///
    /// `chooser` is consulted only when Edge tab replay runs out of
    /// automatic options; pass `None` for strictly non-interactive
    /// behaviour (stragglers open as one grouped batch).
    pub fn restore(
        path: &Path,
        opts: &RestoreOptions,
        chooser: Option<&mut dyn replay::TabChooser>,
    ) -> Result<Summary> {
        let migrated = migrate(model::read_layout_value(path)?)?;
        let layout: LayoutFile =
            serde_json::from_value(migrated).map_err(|e| LayoutError::Json {
                path: path.to_path_buf(),
                source: e,
            })?;

        // Stale layouts may carry processes that joined the block lists
        // since they were saved.
        let total_saved = layout.windows.len();
        let targets: Vec<WindowSnapshotEntry> = layout
            .windows
            .into_iter()
            .filter(|t| {
                !is_blocked_process(&t.process_name) && !is_blocked_class(&t.class_name)
            })
            .collect();
        if targets.len() < total_saved {
            info!(
                skipped = total_saved - targets.len(),
                "ignored blocked-process targets from saved layout"
            );
        }

        let mut summary = Summary {
            total: targets.len(),
            ..Default::default()
        };
        let mut mode_bits = Vec::new();
        if opts.launch_missing {
            mode_bits.push("launch-missing");
        }
        if opts.edge_tabs {
            mode_bits.push("edge-tabs");
        }
        summary.mode = if mode_bits.is_empty() {
            "basic".to_string()
        } else {
            mode_bits.join("+")
        };

        let diag = opts.diagnostics.then_some(opts.diagnostics_top);
        let live = capture::live_windows();
        let mut used: HashSet<WindowHandle> = HashSet::new();
        let mut placed_z: Vec<(WindowHandle, u32)> = Vec::new();
        let mut edge_applied: HashMap<usize, WindowHandle> = HashMap::new();

        // ── Match and place ─────────────────────────
        let all_indices: Vec<usize> = (0..targets.len()).collect();
        let outcome = match_targets(&targets, &all_indices, &live, opts.min_score, &mut used, diag);
        let mut missing = outcome.missing;
        let mut force: HashSet<usize> = missing
            .iter()
            .copied()
            .filter(|&i| opts.destructive && targets[i].destructive)
            .collect();

        for (idx, handle) in outcome.assignments {
            if opts.destructive && targets[idx].destructive {
                // The handle stays claimed so the relaunch gets a fresh match.
                match winx::post_close(handle) {
                    Ok(()) => {
                        summary.closed += 1;
                        debug!(handle = %handle, "closed for clean relaunch");
                    }
                    Err(err) => warn!(handle = %handle, %err, "close failed"),
                }
                missing.push(idx);
                force.insert(idx);
            } else {
                place_matched(
                    &targets,
                    idx,
                    handle,
                    &mut summary,
                    &mut placed_z,
                    &mut edge_applied,
                );
            }
        }
        missing.sort_unstable();

        // ── Launch missing applications ─────────────
        if (opts.launch_missing || !force.is_empty()) && !missing.is_empty() {
            if summary.closed > 0 {
                thread::sleep(Duration::from_millis(300));
            }
            for &idx in &missing {
                if !(opts.launch_missing || force.contains(&idx)) {
                    continue;
                }
                let target = &targets[idx];
                // Edge windows with tabs to replay are launched by the tab
                // manager's own path, which anchors and positions them.
                if opts.edge_tabs
                    && target.is_edge()
                    && !replay::normalize_tabs(&target.edge_tabs).is_empty()
                {
                    continue;
                }
                if launch_target(target) {
                    summary.launched += 1;
                }
            }

            if summary.launched > 0 {
                thread::sleep(opts.settle_wait.max(Duration::from_millis(500)));
                let live2 = capture::live_windows();
                let second =
                    match_targets(&targets, &missing, &live2, opts.min_score, &mut used, diag);
                for (idx, handle) in second.assignments {
                    place_matched(
                        &targets,
                        idx,
                        handle,
                        &mut summary,
                        &mut placed_z,
                        &mut edge_applied,
                    );
                }
                missing = second.missing;
            }
        }
        summary.skipped += missing.len();

        // ── Stabilize Edge sizes before restacking ──
        // Session restore alone can resize Edge windows; catch that before
        // z-order so a corrective placement cannot bury a restacked window.
        if !edge_applied.is_empty() {
            let refs: Vec<(WindowHandle, &WindowSnapshotEntry)> = edge_applied
                .iter()
                .map(|(&i, &h)| (h, &targets[i]))
                .collect();
            summary.edge_size_fixes += replay::stabilize(&refs);
        }

        // ── Z-order ─────────────────────────────────
        summary.z_restored = placement::restore_z_order(&placed_z);
        debug!(
            restored = summary.z_restored,
            placed = placed_z.len(),
            "z-order pass done"
        );

        // ── Edge tab replay ─────────────────────────
        if opts.edge_tabs {
            let (opened, fixes) = replay::replay_tabs(&targets, &edge_applied, &mut used, chooser);
            summary.edge_tabs_opened = opened;
            summary.edge_size_fixes += fixes;
        }

        info!("{summary}");
        if summary.skipped > 0 {
            info!("skipped targets: title changed, window elevated, or system-managed");
        }
        Ok(summary)
    }
}

#[cfg(windows)]
pub use os::{capture, restore, save, SaveReport};

/// Merge live CDP tabs into an existing layout file without recapturing
/// windows. Usable from any host — it only touches the file and the
/// endpoint.
pub fn edge_capture(path: &std::path::Path, port: u16) -> crate::error::Result<(usize, usize)> {
    use crate::edge::{assign, cdp};
    use crate::error::LayoutError;
    use crate::model::{self, LayoutFile};

    let migrated = crate::migrate::migrate(model::read_layout_value(path)?)?;
    let mut layout: LayoutFile =
        serde_json::from_value(migrated).map_err(|e| LayoutError::Json {
            path: path.to_path_buf(),
            source: e,
        })?;

    if !cdp::endpoint_alive(port) {
        return Err(LayoutError::ProtocolUnreachable(port));
    }
    let tabs = cdp::fetch_tabs(port)?;

    let mut edge_wins: Vec<&mut crate::model::WindowSnapshotEntry> =
        layout.windows.iter_mut().filter(|w| w.is_edge()).collect();
    let edge_count = edge_wins.len();
    assign::assign_tabs(&mut edge_wins, &tabs);
    for w in edge_wins {
        if !w.edge_tabs.is_empty() {
            if let Some(meta) = &mut w.edge {
                meta.debug_port = port;
            }
        }
    }
    model::write_layout(path, &layout)?;
    Ok((tabs.len(), edge_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn target(process: &str, title: &str, rect: Rect, z: u32) -> WindowSnapshotEntry {
        WindowSnapshotEntry {
            window_id: format!("id-{z}"),
            title: title.into(),
            class_name: "CabinetWClass".into(),
            process_name: process.into(),
            exe: format!("C:\\windows\\{process}"),
            rect,
            normal_rect: rect,
            restore_rect: rect,
            z_order: z,
            ..Default::default()
        }
    }

    fn live(handle: isize, process: &str, title: &str, rect: Rect, z: u32) -> LiveWindow {
        LiveWindow {
            handle: WindowHandle(handle),
            title: title.into(),
            class_name: "CabinetWClass".into(),
            pid: 500,
            process_name: process.into(),
            exe: format!("C:\\windows\\{process}"),
            show_cmd: Default::default(),
            rect,
            normal_rect: rect,
            z_order: z,
        }
    }

    #[test]
    fn no_handle_is_assigned_twice() {
        let rect = Rect::new(0, 0, 800, 600);
        let targets = vec![
            target("explorer.exe", "Documents", rect, 0),
            target("explorer.exe", "Documents", rect, 1),
        ];
        let live = vec![live(7, "explorer.exe", "Documents", rect, 0)];
        let mut used = HashSet::new();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let outcome = match_targets(&targets, &indices, &live, 40, &mut used, None);
        assert_eq!(outcome.assignments, vec![(0, WindowHandle(7))]);
        assert_eq!(outcome.missing, vec![1]);
    }

    #[test]
    fn identical_titles_do_not_swap_when_enumeration_order_reverses() {
        // Two saved windows for the same process with the same title at
        // side-by-side rects; live enumeration reversed. Geometry must keep
        // each window on its own rect.
        let left = Rect::new(0, 0, 800, 600);
        let right = Rect::new(800, 0, 1600, 600);
        let targets = vec![
            target("explorer.exe", "Documents", left, 0),
            target("explorer.exe", "Documents", right, 1),
        ];
        let live = vec![
            live(20, "explorer.exe", "Documents", right, 0),
            live(10, "explorer.exe", "Documents", left, 1),
        ];
        let mut used = HashSet::new();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let outcome = match_targets(&targets, &indices, &live, 40, &mut used, None);
        assert_eq!(
            outcome.assignments,
            vec![(0, WindowHandle(10)), (1, WindowHandle(20))]
        );
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn unchanged_desktop_matches_every_target() {
        // The round-trip property: a snapshot restored against an
        // identical desktop matches everything and launches nothing.
        let rects = [
            Rect::new(0, 0, 800, 600),
            Rect::new(800, 0, 1600, 600),
            Rect::new(100, 100, 1000, 800),
        ];
        let targets: Vec<_> = rects
            .iter()
            .enumerate()
            .map(|(i, r)| target("code.exe", &format!("window {i}"), *r, i as u32))
            .collect();
        let live_set: Vec<_> = rects
            .iter()
            .enumerate()
            .map(|(i, r)| live(100 + i as isize, "code.exe", &format!("window {i}"), *r, i as u32))
            .collect();
        let mut used = HashSet::new();
        let indices: Vec<usize> = (0..targets.len()).collect();
        let outcome = match_targets(&targets, &indices, &live_set, 40, &mut used, None);
        assert_eq!(outcome.assignments.len(), targets.len());
        assert!(outcome.missing.is_empty());
    }

    #[test]
    fn low_scores_leave_targets_missing() {
        let rect = Rect::new(0, 0, 800, 600);
        let targets = vec![target("code.exe", "main.rs", rect, 0)];
        // Same process name only — exe unknown, class/title differ, rect far off.
        let stranger = LiveWindow {
            exe: String::new(),
            class_name: "SomethingElse".into(),
            ..live(3, "code.exe", "zzz", Rect::new(5000, 5000, 5800, 5600), 0)
        };
        let mut used = HashSet::new();
        let outcome = match_targets(&targets, &[0], &[stranger], 40, &mut used, None);
        assert!(outcome.assignments.is_empty());
        assert_eq!(outcome.missing, vec![0]);
    }

    #[test]
    fn summary_formats_like_the_cli_expects() {
        let summary = Summary {
            mode: "launch-missing+edge-tabs".into(),
            applied: 4,
            skipped: 1,
            total: 5,
            ..Default::default()
        };
        let line = summary.to_string();
        assert!(line.contains("launch-missing+edge-tabs"));
        assert!(line.contains("Applied=4"));
        assert!(line.contains("Skipped=1"));
    }
}
