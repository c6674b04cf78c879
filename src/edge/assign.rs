// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Capture-time assignment of a flat CDP tab list to saved Edge windows.

use std::collections::{BTreeMap, HashSet};

use crate::edge::cdp::CdpTab;
use crate::model::{EdgeTab, WindowSnapshotEntry};
use crate::score::token_jaccard;

/// Minimum token overlap before a title match is trusted. Weaker than the
/// scorer's 0.4 Edge threshold — here a wrong guess only shuffles tabs
/// between windows, there it would misplace a window.
pub const TITLE_OVERLAP_MIN: f64 = 0.3;

/// Remove ` - Microsoft Edge` / ` - Work - Microsoft Edge` style suffixes
/// and fold case, so window titles compare by content.
pub fn strip_edge_suffix(title: &str) -> String {
    let mut s = title.replace("Microsoft\u{200b} Edge", "Microsoft Edge");
    s = s.trim().to_string();
    let mut lower = s.to_lowercase();
    for suffix in [
        " - work - microsoft edge",
        " - personal - microsoft edge",
        " - microsoft edge",
    ] {
        if let Some(pos) = lower.rfind(suffix) {
            s.truncate(pos);
            lower = s.to_lowercase();
        }
    }
    lower.trim().to_string()
}

/// Index of the non-excluded title that best overlaps `tab_title`, if the
/// overlap clears [`TITLE_OVERLAP_MIN`].
pub fn best_title_index(
    tab_title: &str,
    window_titles: &[String],
    excluded: &HashSet<usize>,
) -> Option<usize> {
    let tab_tokens = strip_edge_suffix(tab_title);
    if tab_tokens.is_empty() {
        return None;
    }
    let mut best: Option<(usize, f64)> = None;
    for (i, title) in window_titles.iter().enumerate() {
        if excluded.contains(&i) {
            continue;
        }
        let win_tokens = strip_edge_suffix(title);
        if win_tokens.is_empty() {
            continue;
        }
        let overlap = token_jaccard(&tab_tokens, &win_tokens);
        if overlap > best.map(|(_, s)| s).unwrap_or(0.0) {
            best = Some((i, overlap));
        }
    }
    best.filter(|(_, s)| *s >= TITLE_OVERLAP_MIN).map(|(i, _)| i)
}

/// Distribute CDP-fetched tabs across saved Edge window entries.
///
/// Tabs are grouped by CDP windowId where it is a valid positive integer;
/// each group goes to a window picked in priority order:
///   1. a stored `cdp_window_id` hint on a still-unclaimed window
///   2. title token-overlap with the group's tabs
///   3. the first unclaimed window
/// Ungrouped tabs (no valid windowId) are assigned individually by title
/// overlap, then round-robin. Every input tab lands somewhere: when all
/// windows are claimed, later groups round-robin too rather than dropping
/// tabs.
pub fn assign_tabs(windows: &mut [&mut WindowSnapshotEntry], tabs: &[CdpTab]) {
    if windows.is_empty() || tabs.is_empty() {
        return;
    }
    for w in windows.iter_mut() {
        w.edge_tabs.clear();
    }

    let titles: Vec<String> = windows.iter().map(|w| w.title.clone()).collect();

    let mut by_wid: BTreeMap<i64, Vec<&CdpTab>> = BTreeMap::new();
    let mut no_wid: Vec<&CdpTab> = Vec::new();
    for tab in tabs {
        match tab.window_id {
            Some(wid) => by_wid.entry(wid).or_default().push(tab),
            None => no_wid.push(tab),
        }
    }

    let mut hint_map: BTreeMap<i64, usize> = BTreeMap::new();
    for (i, w) in windows.iter().enumerate() {
        if let Some(meta) = &w.edge {
            if meta.cdp_window_id > 0 {
                hint_map.entry(meta.cdp_window_id).or_insert(i);
            }
        }
    }

    let mut assigned: HashSet<usize> = HashSet::new();
    let mut rr = 0usize;

    for (cdp_wid, group) in &by_wid {
        let pick = hint_map
            .get(cdp_wid)
            .copied()
            .filter(|i| !assigned.contains(i))
            .or_else(|| {
                group
                    .iter()
                    .find_map(|tab| best_title_index(&tab.title, &titles, &assigned))
            })
            .or_else(|| (0..windows.len()).find(|i| !assigned.contains(i)));

        let (idx, claimed) = match pick {
            Some(i) => (i, true),
            None => {
                // All windows claimed: keep the tabs anyway.
                let i = rr % windows.len();
                rr += 1;
                (i, false)
            }
        };
        if claimed {
            assigned.insert(idx);
            if let Some(meta) = &mut windows[idx].edge {
                meta.cdp_window_id = *cdp_wid;
            }
        }
        windows[idx].edge_tabs.extend(group.iter().map(|t| EdgeTab {
            title: t.title.clone(),
            url: t.url.clone(),
        }));
    }

    for tab in no_wid {
        let idx = best_title_index(&tab.title, &titles, &assigned).unwrap_or_else(|| {
            let i = rr % windows.len();
            rr += 1;
            i
        });
        windows[idx].edge_tabs.push(EdgeTab {
            title: tab.title.clone(),
            url: tab.url.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EdgeMeta;

    fn edge_window(title: &str, hint: i64) -> WindowSnapshotEntry {
        WindowSnapshotEntry {
            title: title.into(),
            process_name: "msedge.exe".into(),
            edge: Some(EdgeMeta {
                user_data_dir: String::new(),
                profile_directory: "Default".into(),
                cdp_window_id: hint,
                debug_port: 0,
            }),
            ..Default::default()
        }
    }

    fn tab(title: &str, url: &str, wid: Option<i64>) -> CdpTab {
        CdpTab {
            title: title.into(),
            url: url.into(),
            window_id: wid,
        }
    }

    fn total_assigned(windows: &[WindowSnapshotEntry]) -> usize {
        windows.iter().map(|w| w.edge_tabs.len()).sum()
    }

    #[test]
    fn grouped_tabs_follow_window_id_hints() {
        let mut a = edge_window("Mail - Microsoft Edge", 11);
        let mut b = edge_window("News - Microsoft Edge", 22);
        let tabs = vec![
            tab("Inbox", "https://mail.test/inbox", Some(22)),
            tab("Weather", "https://news.test/wx", Some(11)),
        ];
        {
            let mut wins = vec![&mut a, &mut b];
            assign_tabs(&mut wins, &tabs);
        }
        assert_eq!(a.edge_tabs[0].url, "https://news.test/wx");
        assert_eq!(b.edge_tabs[0].url, "https://mail.test/inbox");
        assert_eq!(total_assigned(&[a, b]), 2);
    }

    #[test]
    fn grouped_tabs_fall_back_to_title_overlap() {
        let mut a = edge_window("Rust Project Docs - Microsoft Edge", 0);
        let mut b = edge_window("Holiday Planning - Microsoft Edge", 0);
        let tabs = vec![
            tab("Holiday Planning Spreadsheet", "https://sheets.test/1", Some(7)),
            tab("Rust Project Docs", "https://docs.test/2", Some(9)),
        ];
        {
            let mut wins = vec![&mut a, &mut b];
            assign_tabs(&mut wins, &tabs);
        }
        assert_eq!(a.edge_tabs.len(), 1);
        assert_eq!(a.edge_tabs[0].url, "https://docs.test/2");
        assert_eq!(b.edge_tabs[0].url, "https://sheets.test/1");
        // The picked windows record the live CDP window id for next time.
        assert_eq!(a.edge.as_ref().unwrap().cdp_window_id, 9);
        assert_eq!(b.edge.as_ref().unwrap().cdp_window_id, 7);
    }

    #[test]
    fn ungrouped_tabs_round_robin_when_titles_do_not_match() {
        let mut a = edge_window("Alpha - Microsoft Edge", 0);
        let mut b = edge_window("Beta - Microsoft Edge", 0);
        let tabs = vec![
            tab("zzz one", "https://one.test", None),
            tab("zzz two", "https://two.test", None),
            tab("zzz three", "https://three.test", None),
        ];
        {
            let mut wins = vec![&mut a, &mut b];
            assign_tabs(&mut wins, &tabs);
        }
        let windows = [a, b];
        assert_eq!(total_assigned(&windows), 3);
        // Round-robin alternates: 2 in the first window, 1 in the second.
        assert_eq!(windows[0].edge_tabs.len(), 2);
        assert_eq!(windows[1].edge_tabs.len(), 1);
    }

    #[test]
    fn conservation_holds_with_more_groups_than_windows() {
        let mut a = edge_window("Only Window - Microsoft Edge", 0);
        let tabs = vec![
            tab("g1 t1", "https://a.test", Some(1)),
            tab("g1 t2", "https://b.test", Some(1)),
            tab("g2 t1", "https://c.test", Some(2)),
            tab("g3 t1", "https://d.test", Some(3)),
            tab("loose", "https://e.test", None),
        ];
        {
            let mut wins = vec![&mut a];
            assign_tabs(&mut wins, &tabs);
        }
        assert_eq!(a.edge_tabs.len(), 5);
    }

    #[test]
    fn reassignment_clears_previous_tabs() {
        let mut a = edge_window("Alpha - Microsoft Edge", 0);
        a.edge_tabs.push(EdgeTab {
            title: "stale".into(),
            url: "https://stale.test".into(),
        });
        let tabs = vec![tab("fresh", "https://fresh.test", Some(4))];
        {
            let mut wins = vec![&mut a];
            assign_tabs(&mut wins, &tabs);
        }
        assert_eq!(a.edge_tabs.len(), 1);
        assert_eq!(a.edge_tabs[0].url, "https://fresh.test");
    }

    #[test]
    fn suffix_stripping_handles_workspace_names() {
        assert_eq!(
            strip_edge_suffix("Project Board - Work - Microsoft Edge"),
            "project board"
        );
        assert_eq!(strip_edge_suffix("Project Board - Microsoft Edge"), "project board");
        assert_eq!(
            strip_edge_suffix("Plain Title"),
            "plain title"
        );
    }
}
