// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Restore-time tab replay.
//!
//! No single delivery mechanism is both precise and always available (many
//! users never start Edge with a debug port), so replay escalates through
//! four tiers per profile group:
//!
//!   1. CDP Target.createTarget into the saved window id       [precise]
//!   2. foreground-shift + `--new-tab` into matched windows    [good]
//!   3. `--new-window` launch, position, shift remaining tabs  [missing windows]
//!   4. interactive chooser, else one grouped batch            [last resort]
//!
//! Edge routes `--new-tab` into whichever window has input focus, which is
//! what makes tier 2 work without a debug session.

use std::collections::{BTreeMap, HashMap};
use std::net::TcpStream;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::capture::default_edge_user_data_dir;
use crate::edge::assign::TITLE_OVERLAP_MIN;
use crate::model::{EdgeTab, WindowHandle, WindowSnapshotEntry};
use crate::score::token_jaccard;

pub const EDGE_EXE_CANDIDATES: &[&str] = &[
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
];

/// URLs per msedge invocation; keeps the command line short.
const TAB_BATCH_SIZE: usize = 10;

pub fn find_edge_exe() -> Option<PathBuf> {
    EDGE_EXE_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

/// Keep only tabs with a usable URL.
pub fn normalize_tabs(tabs: &[EdgeTab]) -> Vec<EdgeTab> {
    tabs.iter()
        .filter(|t| !t.url.trim().is_empty())
        .map(|t| EdgeTab {
            title: t.title.trim().to_string(),
            url: t.url.trim().to_string(),
        })
        .collect()
}

/// Width or height off by more than `threshold` px.
pub fn size_mismatch(a: &crate::model::Rect, b: &crate::model::Rect, threshold: i32) -> bool {
    (a.width() - b.width()).abs() > threshold || (a.height() - b.height()).abs() > threshold
}

fn profile_args(user_data_dir: &str, profile_directory: &str) -> Vec<String> {
    let mut args = Vec::new();
    if !user_data_dir.is_empty() {
        args.push(format!("--user-data-dir={user_data_dir}"));
    }
    if !profile_directory.is_empty() {
        args.push(format!("--profile-directory={profile_directory}"));
    }
    args
}

// ── Delivery planning (pure) ────────────────────────

/// How one saved window's tabs will be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabAction {
    /// A live debug endpoint serves the whole group.
    Protocol { port: u16, window_id: i64 },
    /// Window was matched during placement: focus it, then `--new-tab`.
    Foreground { handle: WindowHandle },
    /// Window is missing entirely: `--new-window` anchored on the first
    /// tab, position it, shift the rest in.
    LaunchWindow,
}

#[derive(Debug, Clone)]
pub struct PlannedDelivery {
    /// Index into the restore target list.
    pub target: usize,
    pub action: TabAction,
    pub tab_count: usize,
}

/// All saved windows sharing one `(user_data_dir, profile_directory)`
/// session — multiple windows of one session, not different profiles.
#[derive(Debug, Clone)]
pub struct PlannedGroup {
    pub user_data_dir: String,
    pub profile_directory: String,
    pub deliveries: Vec<PlannedDelivery>,
}

/// Decide a delivery strategy per profile group. `probe` answers whether a
/// debug endpoint is live on a port; injected so planning is testable
/// without a browser.
pub fn plan_replay(
    targets: &[WindowSnapshotEntry],
    edge_indices: &[usize],
    matched: &HashMap<usize, WindowHandle>,
    probe: &dyn Fn(u16) -> bool,
) -> Vec<PlannedGroup> {
    let mut groups: BTreeMap<(String, String), Vec<usize>> = BTreeMap::new();
    for &i in edge_indices {
        let meta = targets[i].edge.as_ref();
        let udd = meta
            .map(|m| m.user_data_dir.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(default_edge_user_data_dir);
        let profile = meta
            .map(|m| m.profile_directory.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Default".to_string());
        groups.entry((udd, profile)).or_default().push(i);
    }

    let mut planned = Vec::new();
    for ((udd, profile), indices) in groups {
        let live_port = indices.iter().find_map(|&i| {
            let port = targets[i].edge.as_ref().map(|m| m.debug_port).unwrap_or(0);
            (port > 0 && probe(port)).then_some(port)
        });

        let mut deliveries = Vec::new();
        for &i in &indices {
            let tab_count = normalize_tabs(&targets[i].edge_tabs).len();
            if tab_count == 0 {
                continue;
            }
            let action = match live_port {
                Some(port) => TabAction::Protocol {
                    port,
                    window_id: targets[i].edge.as_ref().map(|m| m.cdp_window_id).unwrap_or(0),
                },
                None => match matched.get(&i) {
                    Some(handle) => TabAction::Foreground { handle: *handle },
                    None => TabAction::LaunchWindow,
                },
            };
            deliveries.push(PlannedDelivery {
                target: i,
                action,
                tab_count,
            });
        }
        planned.push(PlannedGroup {
            user_data_dir: udd,
            profile_directory: profile,
            deliveries,
        });
    }
    planned
}

// ── Chooser capability ──────────────────────────────

/// One undelivered tab group shown to a chooser.
pub struct GroupPrompt<'a> {
    pub saved_title: &'a str,
    pub tabs: &'a [EdgeTab],
    /// Live Edge windows, frontmost first.
    pub live: &'a [(WindowHandle, String)],
    /// Best title-overlap suggestion into `live`.
    pub suggested: usize,
}

/// Picks which live window receives a tab group, or `None` to skip.
/// Injected so the replay logic stays testable headlessly.
pub trait TabChooser {
    fn choose(&mut self, prompt: &GroupPrompt<'_>) -> Option<usize>;
}

/// Best title-overlap index into `live_titles`, with its score.
pub fn suggest_window(saved_title: &str, live_titles: &[String]) -> (usize, f64) {
    let saved = crate::edge::assign::strip_edge_suffix(saved_title);
    let mut best = (0usize, -1.0f64);
    for (i, title) in live_titles.iter().enumerate() {
        let score = token_jaccard(&saved, &crate::edge::assign::strip_edge_suffix(title));
        if score > best.1 {
            best = (i, score);
        }
    }
    best
}

/// Non-interactive chooser: take the suggestion when the overlap is
/// convincing, otherwise skip the group.
pub struct AutoChooser;

impl TabChooser for AutoChooser {
    fn choose(&mut self, prompt: &GroupPrompt<'_>) -> Option<usize> {
        let titles: Vec<String> = prompt.live.iter().map(|(_, t)| t.clone()).collect();
        let (idx, score) = suggest_window(prompt.saved_title, &titles);
        (score >= TITLE_OVERLAP_MIN).then_some(idx)
    }
}

/// Terminal wizard: show live windows and the tab group, let the operator
/// pick. Only installed when stdin is a terminal.
pub struct TerminalChooser;

impl TabChooser for TerminalChooser {
    fn choose(&mut self, prompt: &GroupPrompt<'_>) -> Option<usize> {
        if prompt.live.is_empty() {
            return None;
        }
        println!();
        println!("  Edge tab assignment");
        println!("  Live Edge windows (currently open):");
        for (i, (_, title)) in prompt.live.iter().enumerate() {
            println!("    [{i}] {}", truncate(title, 70));
        }
        println!("  Tab group '{}':", truncate(prompt.saved_title, 60));
        for (i, tab) in prompt.tabs.iter().enumerate() {
            println!("    {}. {}", i + 1, tab.url);
        }
        print_flush(&format!(
            "  Open in which window? [0-{}] (default {}, s=skip): ",
            prompt.live.len() - 1,
            prompt.suggested
        ));
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).is_err() {
            return None;
        }
        let sel = line.trim().to_lowercase();
        if sel == "s" {
            return None;
        }
        if sel.is_empty() {
            return Some(prompt.suggested);
        }
        match sel.parse::<usize>() {
            Ok(i) if i < prompt.live.len() => Some(i),
            _ => None,
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn print_flush(s: &str) {
    use std::io::Write;
    print!("{s}");
    let _ = std::io::stdout().flush();
}

// ── Process-level helpers ───────────────────────────

fn port_open(port: u16) -> bool {
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    TcpStream::connect_timeout(&addr, Duration::from_millis(500)).is_ok()
}

/// Open URLs in a specific Edge profile session.
///
/// If Edge already runs that profile, `--new-tab` lands in the running
/// session; `new_window` forces a separate window when no existing window
/// could be matched.
pub fn open_tabs_in_profile(
    exe: &Path,
    tabs: &[EdgeTab],
    user_data_dir: &str,
    profile_directory: &str,
    new_window: bool,
) -> usize {
    let urls: Vec<&str> = tabs
        .iter()
        .map(|t| t.url.trim())
        .filter(|u| !u.is_empty())
        .collect();
    if urls.is_empty() || !exe.exists() {
        return 0;
    }
    let base = profile_args(user_data_dir, profile_directory);
    let flag = if new_window { "--new-window" } else { "--new-tab" };
    let mut launched = 0;
    for chunk in urls.chunks(TAB_BATCH_SIZE) {
        debug!(flag, profile = profile_directory, count = chunk.len(), "opening Edge tabs");
        match Command::new(exe).args(&base).arg(flag).args(chunk).spawn() {
            Ok(_) => launched += chunk.len(),
            Err(e) => {
                warn!(error = %e, "could not open Edge tabs");
                break;
            }
        }
    }
    launched
}

/// Start a debug-mode Edge on a scratch profile. Refuses when the port is
/// already bound (a session is live, or something else owns it).
pub fn launch_debug_session(port: u16, profile_dir: Option<&Path>, dry_run: bool) -> bool {
    let Some(exe) = find_edge_exe() else {
        warn!("Edge executable not found");
        return false;
    };
    if port_open(port) {
        warn!(port, "port already in use");
        return false;
    }
    let profile = match profile_dir {
        Some(p) => p.to_path_buf(),
        None => {
            let temp = std::env::var("TEMP").unwrap_or_else(|_| r"C:\Temp".to_string());
            Path::new(&temp).join("edge-debug")
        }
    };
    let args = [
        format!("--remote-debugging-port={port}"),
        format!("--user-data-dir={}", profile.display()),
    ];
    if dry_run {
        info!(exe = %exe.display(), ?args, "dry run");
        return true;
    }
    match Command::new(&exe).args(&args).spawn() {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "could not launch debug Edge");
            false
        }
    }
}

// ── Win32-backed delivery ───────────────────────────

#[cfg(windows)]
mod os {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    use crate::capture::live_windows;
    use crate::edge::cdp;
    use crate::model::ShowState;
    use crate::placement::apply_placement;
    use crate::score::EDGE_PROCESS;
    use crate::winx;

    /// Wait after SetForegroundWindow before launching the tab command, so
    /// the focus transfer completes and Edge routes the tabs correctly.
    const FOCUS_DELAY: Duration = Duration::from_millis(250);
    /// Wait after each batch so Edge finishes routing before focus moves on.
    const TAB_BATCH_DELAY: Duration = Duration::from_millis(400);
    /// How long a freshly launched window gets to appear.
    const NEW_WINDOW_WAIT: Duration = Duration::from_secs(4);
    const NEW_WINDOW_POLL: Duration = Duration::from_millis(400);
    /// Tab loading can make Edge resize itself; re-apply placement while
    /// the size drifts more than this from the saved target.
    const STABILIZE_RETRIES: usize = 3;
    const STABILIZE_DELAY: Duration = Duration::from_millis(350);
    const SIZE_DRIFT_PX: i32 = 40;

    /// Bring a matched Edge window to the foreground, then open its tabs
    /// with `--new-tab`; focus routing delivers them to that window.
    pub fn open_tabs_via_foreground(
        exe: &Path,
        handle: WindowHandle,
        tabs: &[EdgeTab],
        user_data_dir: &str,
        profile_directory: &str,
    ) -> usize {
        let urls: Vec<&str> = tabs
            .iter()
            .map(|t| t.url.trim())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() || !exe.exists() {
            return 0;
        }

        if !winx::set_foreground(handle) {
            // Carry on anyway; --new-tab may still land correctly.
            debug!(handle = %handle, "SetForegroundWindow failed");
        }
        // A minimised window is not the active window for tab routing.
        let (state, _) = winx::placement(handle);
        if state == ShowState::Minimized {
            winx::show_restore(handle);
        }
        thread::sleep(FOCUS_DELAY);

        let base = profile_args(user_data_dir, profile_directory);
        let mut launched = 0;
        for chunk in urls.chunks(TAB_BATCH_SIZE) {
            debug!(handle = %handle, count = chunk.len(), "foreground-shift tab batch");
            match Command::new(exe).args(&base).arg("--new-tab").args(chunk).spawn() {
                Ok(_) => launched += chunk.len(),
                Err(e) => {
                    warn!(error = %e, "could not open Edge tabs");
                    break;
                }
            }
        }
        if launched > 0 {
            thread::sleep(TAB_BATCH_DELAY);
        }
        launched
    }

    /// Open a new Edge window for a saved target that is no longer
    /// running, then position it to the saved geometry.
    ///
    /// The first tab URL anchors the window so it has a meaningful title
    /// and size from the start; the caller shifts the remaining tabs in
    /// afterwards. Returns the new handle, or `None` if it never appeared
    /// within the wait.
    pub fn launch_and_position_window(
        exe: &Path,
        target: &WindowSnapshotEntry,
        used: &mut HashSet<WindowHandle>,
        user_data_dir: &str,
        profile_directory: &str,
    ) -> Option<WindowHandle> {
        let tabs = normalize_tabs(&target.edge_tabs);
        let anchor = tabs.first().map(|t| t.url.as_str()).unwrap_or("about:blank");

        let base = profile_args(user_data_dir, profile_directory);
        if let Err(e) = Command::new(exe)
            .args(&base)
            .arg("--new-window")
            .arg(anchor)
            .spawn()
        {
            warn!(error = %e, "could not launch Edge window");
            return None;
        }

        let deadline = std::time::Instant::now() + NEW_WINDOW_WAIT;
        let mut new_handle = None;
        while std::time::Instant::now() < deadline && new_handle.is_none() {
            thread::sleep(NEW_WINDOW_POLL);
            new_handle = live_windows()
                .into_iter()
                .find(|w| {
                    w.process_name.eq_ignore_ascii_case(EDGE_PROCESS)
                        && !used.contains(&w.handle)
                })
                .map(|w| w.handle);
        }
        let handle = match new_handle {
            Some(h) => h,
            None => {
                warn!(title = %target.title, "new Edge window did not appear");
                return None;
            }
        };
        used.insert(handle);

        if let Err(e) = apply_placement(handle, target) {
            warn!(handle = %handle, error = %e, "could not position new Edge window");
        }
        info!(handle = %handle, title = %target.title, "launched Edge window");
        Some(handle)
    }

    /// Re-apply placement while tab loading makes Edge resize itself.
    pub fn stabilize(applied: &[(WindowHandle, &WindowSnapshotEntry)]) -> usize {
        let mut fixed = 0;
        for _ in 0..STABILIZE_RETRIES {
            thread::sleep(STABILIZE_DELAY);
            let mut any_fixed = false;
            for (handle, target) in applied {
                if !winx::is_window(*handle) {
                    continue;
                }
                let current = winx::window_rect(*handle);
                let wanted = target.anchor_rect();
                if wanted.is_valid() && size_mismatch(&current, &wanted, SIZE_DRIFT_PX) {
                    if apply_placement(*handle, target).is_ok() {
                        fixed += 1;
                        any_fixed = true;
                    }
                }
            }
            if !any_fixed {
                break;
            }
        }
        fixed
    }

    /// Run the full tiered replay for every saved Edge target.
    ///
    /// Returns the number of tabs opened plus the size fixes applied to
    /// windows that replay itself touched.
    pub fn replay_tabs(
        targets: &[WindowSnapshotEntry],
        matched: &HashMap<usize, WindowHandle>,
        used: &mut HashSet<WindowHandle>,
        mut chooser: Option<&mut dyn TabChooser>,
    ) -> (usize, usize) {
        let edge_indices: Vec<usize> = targets
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_edge())
            .map(|(i, _)| i)
            .collect();
        if edge_indices.is_empty() {
            return (0, 0);
        }
        let Some(exe) = find_edge_exe() else {
            warn!("Edge executable not found; cannot replay tabs");
            return (0, 0);
        };

        let plan = plan_replay(targets, &edge_indices, matched, &cdp::endpoint_alive);
        let mut opened = 0;
        let mut touched: Vec<(WindowHandle, usize)> = Vec::new();

        for group in &plan {
            let udd = group.user_data_dir.as_str();
            let profile = group.profile_directory.as_str();
            let mut undelivered: Vec<usize> = Vec::new();

            for delivery in &group.deliveries {
                let target = &targets[delivery.target];
                let tabs = normalize_tabs(&target.edge_tabs);
                match &delivery.action {
                    TabAction::Protocol { port, window_id } => {
                        for tab in &tabs {
                            if *window_id > 0 && cdp::open_tab_in_window(*port, *window_id, &tab.url)
                            {
                                opened += 1;
                                debug!(port, window_id, url = %tab.url, "tab opened via CDP");
                            } else {
                                // Endpoint can't target the window: at least
                                // land the tab in the right session.
                                opened += open_tabs_in_profile(
                                    &exe,
                                    std::slice::from_ref(tab),
                                    udd,
                                    profile,
                                    false,
                                );
                            }
                        }
                        if let Some(handle) = matched.get(&delivery.target) {
                            touched.push((*handle, delivery.target));
                        }
                    }
                    TabAction::Foreground { handle } => {
                        opened += open_tabs_via_foreground(&exe, *handle, &tabs, udd, profile);
                        touched.push((*handle, delivery.target));
                    }
                    TabAction::LaunchWindow => {
                        match launch_and_position_window(&exe, target, used, udd, profile) {
                            Some(handle) => {
                                // First URL was the anchor; it is already open.
                                if tabs.len() > 1 {
                                    open_tabs_via_foreground(&exe, handle, &tabs[1..], udd, profile);
                                }
                                opened += tabs.len();
                                touched.push((handle, delivery.target));
                            }
                            None => undelivered.push(delivery.target),
                        }
                    }
                }
            }

            if undelivered.is_empty() {
                continue;
            }

            // Tier 4a: hand the stragglers to the chooser, if any.
            let mut leftover: Vec<usize> = Vec::new();
            if let Some(chooser) = chooser.as_deref_mut() {
                let live: Vec<(WindowHandle, String)> = live_windows()
                    .into_iter()
                    .filter(|w| w.process_name.eq_ignore_ascii_case(EDGE_PROCESS))
                    .map(|w| (w.handle, w.title))
                    .collect();
                let titles: Vec<String> = live.iter().map(|(_, t)| t.clone()).collect();
                for idx in undelivered {
                    let target = &targets[idx];
                    let tabs = normalize_tabs(&target.edge_tabs);
                    let (suggested, _) = suggest_window(&target.title, &titles);
                    let prompt = GroupPrompt {
                        saved_title: &target.title,
                        tabs: &tabs,
                        live: &live,
                        suggested,
                    };
                    match chooser.choose(&prompt) {
                        Some(pick) if pick < live.len() => {
                            let n =
                                open_tabs_via_foreground(&exe, live[pick].0, &tabs, udd, profile);
                            opened += n;
                            touched.push((live[pick].0, idx));
                        }
                        _ => leftover.push(idx),
                    }
                }
            } else {
                leftover = undelivered;
            }

            // Tier 4b: one grouped batch in a fresh window, best effort.
            let mut grouped: Vec<EdgeTab> = Vec::new();
            for idx in leftover {
                grouped.extend(normalize_tabs(&targets[idx].edge_tabs));
            }
            if !grouped.is_empty() {
                info!(
                    count = grouped.len(),
                    "tabs could not be placed into individual windows; opening as group"
                );
                opened += open_tabs_in_profile(&exe, &grouped, udd, profile, true);
            }
        }

        let refs: Vec<(WindowHandle, &WindowSnapshotEntry)> = touched
            .iter()
            .map(|(h, i)| (*h, &targets[*i]))
            .collect();
        let fixes = stabilize(&refs);
        (opened, fixes)
    }
}

#[cfg(windows)]
pub use os::{launch_and_position_window, open_tabs_via_foreground, replay_tabs, stabilize};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdgeMeta, Rect};

    fn edge_target(title: &str, profile: &str, port: u16, wid: i64, urls: &[&str]) -> WindowSnapshotEntry {
        WindowSnapshotEntry {
            title: title.into(),
            process_name: "msedge.exe".into(),
            edge: Some(EdgeMeta {
                user_data_dir: r"C:\Users\me\AppData\Local\Microsoft\Edge\User Data".into(),
                profile_directory: profile.into(),
                cdp_window_id: wid,
                debug_port: port,
            }),
            edge_tabs: urls
                .iter()
                .map(|u| EdgeTab {
                    title: String::new(),
                    url: (*u).to_string(),
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn dead_endpoint_falls_through_to_foreground_shift() {
        // One saved Edge window, 3 tabs sharing a CDP window id, endpoint
        // unreachable: replay must plan a foreground-shift of all 3 tabs.
        let targets = vec![edge_target(
            "Research - Microsoft Edge",
            "Default",
            9222,
            4,
            &["https://a.test", "https://b.test", "https://c.test"],
        )];
        let mut matched = HashMap::new();
        matched.insert(0, WindowHandle(0x42));
        let plan = plan_replay(&targets, &[0], &matched, &|_| false);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].deliveries.len(), 1);
        assert_eq!(
            plan[0].deliveries[0].action,
            TabAction::Foreground {
                handle: WindowHandle(0x42)
            }
        );
        assert_eq!(plan[0].deliveries[0].tab_count, 3);
    }

    #[test]
    fn live_endpoint_uses_protocol_for_the_whole_group() {
        let targets = vec![
            edge_target("One", "Default", 9222, 4, &["https://a.test"]),
            edge_target("Two", "Default", 0, 9, &["https://b.test"]),
        ];
        let plan = plan_replay(&targets, &[0, 1], &HashMap::new(), &|port| port == 9222);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].deliveries.len(), 2);
        for d in &plan[0].deliveries {
            assert!(matches!(d.action, TabAction::Protocol { port: 9222, .. }));
        }
    }

    #[test]
    fn unmatched_windows_plan_a_launch() {
        let targets = vec![edge_target("Gone", "Default", 0, 0, &["https://a.test"])];
        let plan = plan_replay(&targets, &[0], &HashMap::new(), &|_| false);
        assert_eq!(plan[0].deliveries[0].action, TabAction::LaunchWindow);
    }

    #[test]
    fn groups_split_by_profile_session() {
        let targets = vec![
            edge_target("W1", "Default", 0, 0, &["https://a.test"]),
            edge_target("W2", "Profile 2", 0, 0, &["https://b.test"]),
            edge_target("W3", "Default", 0, 0, &["https://c.test"]),
        ];
        let plan = plan_replay(&targets, &[0, 1, 2], &HashMap::new(), &|_| false);
        assert_eq!(plan.len(), 2);
        let default_group = plan
            .iter()
            .find(|g| g.profile_directory == "Default")
            .unwrap();
        assert_eq!(default_group.deliveries.len(), 2);
    }

    #[test]
    fn tabless_windows_get_no_delivery() {
        let targets = vec![edge_target("Empty", "Default", 0, 0, &[])];
        let plan = plan_replay(&targets, &[0], &HashMap::new(), &|_| false);
        assert!(plan[0].deliveries.is_empty());
    }

    #[test]
    fn auto_chooser_takes_convincing_suggestions_only() {
        let tabs = vec![EdgeTab {
            title: String::new(),
            url: "https://a.test".into(),
        }];
        let live = vec![
            (WindowHandle(1), "Holiday Planning - Microsoft Edge".to_string()),
            (WindowHandle(2), "Rust Docs - Microsoft Edge".to_string()),
        ];
        let mut chooser = AutoChooser;
        let pick = chooser.choose(&GroupPrompt {
            saved_title: "Rust Docs - Microsoft Edge",
            tabs: &tabs,
            live: &live,
            suggested: 1,
        });
        assert_eq!(pick, Some(1));

        let pick = chooser.choose(&GroupPrompt {
            saved_title: "Totally Unrelated Window",
            tabs: &tabs,
            live: &live,
            suggested: 0,
        });
        assert_eq!(pick, None);
    }

    #[test]
    fn normalize_drops_empty_urls() {
        let tabs = vec![
            EdgeTab {
                title: "a".into(),
                url: "  ".into(),
            },
            EdgeTab {
                title: "b".into(),
                url: "https://b.test".into(),
            },
        ];
        assert_eq!(normalize_tabs(&tabs).len(), 1);
    }

    #[test]
    fn size_mismatch_compares_dimensions_not_position() {
        let a = Rect::new(0, 0, 800, 600);
        let moved = Rect::new(500, 500, 1300, 1100);
        assert!(!size_mismatch(&a, &moved, 40));
        let grown = Rect::new(0, 0, 880, 600);
        assert!(size_mismatch(&a, &grown, 40));
    }
}
