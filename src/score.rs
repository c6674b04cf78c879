// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Match scorer and candidate ranker.
//!
//! All thresholds are empirically chosen defaults; they are named constants
//! rather than derived values on purpose.

use std::collections::HashSet;

use tracing::info;

use crate::model::{LiveWindow, WindowHandle, WindowSnapshotEntry};

pub const EDGE_PROCESS: &str = "msedge.exe";

/// Documented score ceiling.
pub const SCORE_MAX: i32 = 165;
/// Default minimum acceptable score; below it a target counts as missing.
pub const DEFAULT_MIN_SCORE: i32 = 40;

const EXE_POINTS: i32 = 50;
const PROCESS_POINTS: i32 = 25;
const CLASS_POINTS: i32 = 15;
const TITLE_EXACT_POINTS: i32 = 40;
const TITLE_PARTIAL_POINTS: i32 = 15;
/// Edge titles mutate with the active tab, so a strong overlap is worth a
/// nudge at most.
const TITLE_EDGE_POINTS: i32 = 8;
const EDGE_TITLE_OVERLAP_MIN: f64 = 0.4;
const GEOMETRY_NEAR_POINTS: i32 = 30;
const GEOMETRY_FAR_POINTS: i32 = 15;
const GEOMETRY_NEAR_PX: i32 = 40;
const GEOMETRY_FAR_PX: i32 = 120;

/// Per-candidate point breakdown. Transient; never persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreBreakdown {
    pub exe: i32,
    pub process: i32,
    pub class: i32,
    pub title: i32,
    pub geometry: i32,
    pub edge_title_deweighted: bool,
    pub total: i32,
}

/// Token-set Jaccard overlap of two already-normalised strings.
pub(crate) fn token_jaccard(a: &str, b: &str) -> f64 {
    let at: HashSet<&str> = a.split_whitespace().collect();
    let bt: HashSet<&str> = b.split_whitespace().collect();
    if at.is_empty() || bt.is_empty() {
        return 0.0;
    }
    let intersection = at.intersection(&bt).count();
    let union = at.union(&bt).count();
    intersection as f64 / union.max(1) as f64
}

/// Score a live candidate against a saved target.
///
/// exe path        +50  (always true when pre-filtered by exe)
/// process name    +25
/// class name      +15
/// title exact     +40  (Edge: token overlap ≥0.4 gives +8 instead — the
/// title partial   +15   active-tab title changes constantly)
/// geometry ≤ 40px +30  ← primary tiebreaker for identical-title windows
/// geometry ≤120px +15
pub fn score(candidate: &LiveWindow, target: &WindowSnapshotEntry) -> ScoreBreakdown {
    let mut comps = ScoreBreakdown::default();

    let t_exe = target.exe.to_lowercase();
    let c_exe = candidate.exe.to_lowercase();
    if !t_exe.is_empty() && t_exe == c_exe {
        comps.exe = EXE_POINTS;
    }

    let t_proc = target.process_name.to_lowercase();
    let c_proc = candidate.process_name.to_lowercase();
    if !t_proc.is_empty() && t_proc == c_proc {
        comps.process = PROCESS_POINTS;
    }

    let t_class = target.class_name.to_lowercase();
    let c_class = candidate.class_name.to_lowercase();
    if !t_class.is_empty() && t_class == c_class {
        comps.class = CLASS_POINTS;
    }

    let t_title = target.title.to_lowercase();
    let c_title = candidate.title.to_lowercase();
    if t_proc == EDGE_PROCESS {
        comps.edge_title_deweighted = true;
        if token_jaccard(&t_title, &c_title) >= EDGE_TITLE_OVERLAP_MIN {
            comps.title = TITLE_EDGE_POINTS;
        }
    } else if !t_title.is_empty() && !c_title.is_empty() {
        if t_title == c_title {
            comps.title = TITLE_EXACT_POINTS;
        } else if t_title.contains(&c_title) || c_title.contains(&t_title) {
            comps.title = TITLE_PARTIAL_POINTS;
        }
    }

    let t_rect = target.anchor_rect();
    let c_rect = candidate.anchor_rect();
    if t_rect.is_valid() && c_rect.is_valid() {
        if c_rect.close_to(&t_rect, GEOMETRY_NEAR_PX) {
            comps.geometry = GEOMETRY_NEAR_POINTS;
        } else if c_rect.close_to(&t_rect, GEOMETRY_FAR_PX) {
            comps.geometry = GEOMETRY_FAR_POINTS;
        }
    }

    comps.total = comps.exe + comps.process + comps.class + comps.title + comps.geometry;
    comps
}

#[derive(Debug, Clone)]
pub struct RankedCandidate<'a> {
    pub window: &'a LiveWindow,
    pub breakdown: ScoreBreakdown,
}

/// Pre-filter to the target's exe (process name when the exe is unknown),
/// score what remains, and rank descending. Already-claimed handles are
/// skipped, which makes assignment greedy and exclusive.
pub fn rank_candidates<'a>(
    target: &WindowSnapshotEntry,
    live: &'a [LiveWindow],
    used: &HashSet<WindowHandle>,
) -> Vec<RankedCandidate<'a>> {
    let t_exe = target.exe.to_lowercase();
    let t_proc = target.process_name.to_lowercase();
    let mut ranked: Vec<RankedCandidate<'a>> = live
        .iter()
        .filter(|c| !used.contains(&c.handle))
        .filter(|c| {
            let c_exe = c.exe.to_lowercase();
            let c_proc = c.process_name.to_lowercase();
            if !t_exe.is_empty() && !c_exe.is_empty() {
                t_exe == c_exe
            } else if !t_proc.is_empty() && !c_proc.is_empty() {
                t_proc == c_proc
            } else {
                true
            }
        })
        .map(|c| RankedCandidate {
            window: c,
            breakdown: score(c, target),
        })
        .collect();
    // Stable sort: ties keep enumeration (z) order.
    ranked.sort_by_key(|r| std::cmp::Reverse(r.breakdown.total));
    ranked
}

/// Diagnostics for operators: why did this target match (or not).
pub fn log_diagnostics(target: &WindowSnapshotEntry, ranked: &[RankedCandidate<'_>], top_n: usize) {
    info!(
        process = %target.process_name,
        title = %target.title,
        "match diagnostics for target"
    );
    if ranked.is_empty() {
        info!("  no candidates");
        return;
    }
    for (i, item) in ranked.iter().take(top_n.max(1)).enumerate() {
        let b = &item.breakdown;
        info!(
            "  #{} hwnd={} score={} (exe={} proc={} cls={} title={} geo={}){}",
            i + 1,
            item.window.handle,
            b.total,
            b.exe,
            b.process,
            b.class,
            b.title,
            b.geometry,
            if b.edge_title_deweighted { " edge-deweighted" } else { "" },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn target(process: &str, title: &str, rect: Rect) -> WindowSnapshotEntry {
        WindowSnapshotEntry {
            title: title.into(),
            class_name: "MainFrame".into(),
            process_name: process.into(),
            exe: format!("C:\\apps\\{process}"),
            normal_rect: rect,
            rect,
            restore_rect: rect,
            ..Default::default()
        }
    }

    fn candidate(handle: isize, process: &str, title: &str, rect: Rect) -> LiveWindow {
        LiveWindow {
            handle: WindowHandle(handle),
            title: title.into(),
            class_name: "MainFrame".into(),
            pid: 1000,
            process_name: process.into(),
            exe: format!("C:\\apps\\{process}"),
            show_cmd: Default::default(),
            rect,
            normal_rect: rect,
            z_order: 0,
        }
    }

    #[test]
    fn geometry_bands_are_monotonic() {
        let base = Rect::new(0, 0, 800, 600);
        let t = target("notepad.exe", "readme", base);
        let near = score(&candidate(1, "notepad.exe", "readme", Rect::new(30, 30, 830, 630)), &t);
        let far = score(&candidate(2, "notepad.exe", "readme", Rect::new(100, 100, 900, 700)), &t);
        let out = score(&candidate(3, "notepad.exe", "readme", Rect::new(500, 500, 1300, 1100)), &t);
        assert!(near.total > far.total);
        assert!(far.total > out.total);
        assert_eq!(near.geometry, 30);
        assert_eq!(far.geometry, 15);
        assert_eq!(out.geometry, 0);
    }

    #[test]
    fn edge_titles_are_deweighted() {
        let rect = Rect::new(0, 0, 800, 600);
        let t = target("msedge.exe", "Inbox - Mail - Microsoft Edge", rect);
        let same = score(&candidate(1, "msedge.exe", "Inbox - Mail - Microsoft Edge", rect), &t);
        let wild = score(&candidate(2, "msedge.exe", "Completely Different Tab", rect), &t);
        assert!(same.edge_title_deweighted);
        assert!(same.title <= 8);
        // Wildly different titles stay in the same band: title ≤ 8 apart.
        assert!((same.total - wild.total).abs() <= 8);
    }

    #[test]
    fn non_edge_titles_separate_strictly() {
        let rect = Rect::new(0, 0, 800, 600);
        let t = target("code.exe", "main.rs - project", rect);
        let exact = score(&candidate(1, "code.exe", "main.rs - project", rect), &t);
        let partial = score(&candidate(2, "code.exe", "main.rs", rect), &t);
        let none = score(&candidate(3, "code.exe", "zzz", rect), &t);
        assert!(exact.total > partial.total);
        assert!(partial.total > none.total);
        assert_eq!(exact.title, 40);
        assert_eq!(partial.title, 15);
    }

    #[test]
    fn rank_prefilters_by_exe_and_skips_used() {
        let rect = Rect::new(0, 0, 800, 600);
        let t = target("notepad.exe", "readme", rect);
        let live = vec![
            candidate(1, "notepad.exe", "readme", rect),
            candidate(2, "code.exe", "readme", rect),
            candidate(3, "notepad.exe", "readme", rect),
        ];
        let mut used = HashSet::new();
        used.insert(WindowHandle(1));
        let ranked = rank_candidates(&t, &live, &used);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].window.handle, WindowHandle(3));
    }

    #[test]
    fn duplicate_titles_break_ties_on_geometry() {
        // Two file-manager windows on the same folder; geometry is all that
        // distinguishes them.
        let left_rect = Rect::new(0, 0, 800, 600);
        let right_rect = Rect::new(800, 0, 1600, 600);
        let t = target("explorer.exe", "Documents", left_rect);
        let live = vec![
            candidate(10, "explorer.exe", "Documents", right_rect),
            candidate(11, "explorer.exe", "Documents", left_rect),
        ];
        let ranked = rank_candidates(&t, &live, &HashSet::new());
        assert_eq!(ranked[0].window.handle, WindowHandle(11));
        assert!(ranked[0].breakdown.total > ranked[1].breakdown.total);
    }

    #[test]
    fn token_jaccard_bounds() {
        assert_eq!(token_jaccard("", "anything"), 0.0);
        assert_eq!(token_jaccard("a b c", "a b c"), 1.0);
        let mid = token_jaccard("rust window layout", "rust layout guide");
        assert!(mid > 0.0 && mid < 1.0);
    }
}
