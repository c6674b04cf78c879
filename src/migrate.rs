// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Layout schema migration.
//!
//! One canonical in-memory model, one migrate function. v1 layouts kept
//! Edge tabs in file-wide `browser_tabs.<browser>.tabs` / `open_urls.<browser>`
//! lists; v2 stores them per window. Migration is one-way, idempotent, and
//! drops the legacy keys entirely. Nothing downstream ever branches on the
//! schema version.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::edge::assign::best_title_index;
use crate::error::{LayoutError, Result};
use crate::model::{SCHEMA, SCHEMA_V1};
use crate::score::EDGE_PROCESS;

/// Upgrade a parsed layout to the current schema.
///
/// A v2 layout comes back unchanged except that every window is guaranteed
/// a `window_id`. Unrecognised schemas are fatal: silently guessing could
/// misplace every window on restore.
pub fn migrate(mut layout: Value) -> Result<Value> {
    let obj = layout
        .as_object_mut()
        .ok_or_else(|| LayoutError::Malformed("layout root is not an object".into()))?;

    let schema = obj
        .get("schema")
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_string();

    match schema.as_str() {
        SCHEMA => {
            validate_windows(obj)?;
            ensure_ids(obj);
            Ok(layout)
        }
        SCHEMA_V1 => {
            validate_windows(obj)?;
            let tabs = take_legacy_tabs(obj);
            distribute_tabs(obj, &tabs);
            obj.insert("schema".into(), Value::String(SCHEMA.into()));
            ensure_ids(obj);
            Ok(layout)
        }
        _ => Err(LayoutError::SchemaUnsupported {
            found: schema,
            expected: SCHEMA.to_string(),
        }),
    }
}

fn windows_mut(obj: &mut Map<String, Value>) -> &mut Vec<Value> {
    if !matches!(obj.get("windows"), Some(Value::Array(_))) {
        obj.insert("windows".into(), Value::Array(Vec::new()));
    }
    match obj.get_mut("windows") {
        Some(Value::Array(list)) => list,
        _ => unreachable!("windows key was just ensured"),
    }
}

/// Malformed records are rejected here, at the boundary, rather than deep
/// in matching logic.
fn validate_windows(obj: &mut Map<String, Value>) -> Result<()> {
    let Some(windows) = obj.get("windows").and_then(Value::as_array) else {
        return Ok(());
    };
    for (index, win) in windows.iter().enumerate() {
        let Some(entry) = win.as_object() else {
            return Err(LayoutError::Malformed(format!(
                "window record {index} is not an object"
            )));
        };
        let has_rect = ["restore_rect", "rect", "normal_rect"]
            .iter()
            .any(|key| is_rect4(entry.get(*key)));
        if !has_rect {
            return Err(LayoutError::Malformed(format!(
                "window record {index} has no usable rect"
            )));
        }
    }
    Ok(())
}

fn is_rect4(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_array)
        .map(|a| a.len() == 4 && a.iter().all(Value::is_number))
        .unwrap_or(false)
}

fn ensure_ids(obj: &mut Map<String, Value>) {
    for win in windows_mut(obj) {
        let Some(entry) = win.as_object_mut() else {
            continue;
        };
        let blank = entry
            .get("window_id")
            .and_then(Value::as_str)
            .map(|s| s.trim().is_empty())
            .unwrap_or(true);
        if blank {
            entry.insert("window_id".into(), Value::String(Uuid::new_v4().to_string()));
        }
    }
}

/// Pull Edge tabs out of the legacy file-wide keys, removing them.
///
/// `browser_tabs.msedge.tabs` holds `{title, url}` objects; `open_urls.msedge`
/// holds bare URL strings. Both keyed with or without the `.exe` suffix.
fn take_legacy_tabs(obj: &mut Map<String, Value>) -> Vec<(String, String)> {
    let mut tabs: Vec<(String, String)> = Vec::new();

    if let Some(Value::Object(browsers)) = obj.remove("browser_tabs") {
        for (browser, spec) in browsers {
            if !is_edge_key(&browser) {
                continue;
            }
            let Some(list) = spec.get("tabs").and_then(Value::as_array) else {
                continue;
            };
            for tab in list {
                let url = tab.get("url").and_then(Value::as_str).unwrap_or("").trim();
                if url.is_empty() {
                    continue;
                }
                let title = tab.get("title").and_then(Value::as_str).unwrap_or("").trim();
                tabs.push((title.to_string(), url.to_string()));
            }
        }
    }

    if let Some(Value::Object(browsers)) = obj.remove("open_urls") {
        for (browser, list) in browsers {
            if !is_edge_key(&browser) {
                continue;
            }
            let Some(urls) = list.as_array() else {
                continue;
            };
            for url in urls {
                let url = url.as_str().unwrap_or("").trim();
                if !url.is_empty() {
                    tabs.push((String::new(), url.to_string()));
                }
            }
        }
    }

    tabs
}

fn is_edge_key(key: &str) -> bool {
    key.trim()
        .to_ascii_lowercase()
        .trim_end_matches(".exe")
        .eq(EDGE_PROCESS.trim_end_matches(".exe"))
}

/// Put legacy tabs onto Edge windows using the ungrouped assignment rule:
/// title overlap first, round-robin for the rest. Windows gain a default
/// `edge` metadata object when the legacy file carried none.
fn distribute_tabs(obj: &mut Map<String, Value>, tabs: &[(String, String)]) {
    let windows = windows_mut(obj);
    let mut edge_indices = Vec::new();
    let mut edge_titles = Vec::new();
    for (i, win) in windows.iter().enumerate() {
        let process = win
            .get("process_name")
            .and_then(Value::as_str)
            .unwrap_or("");
        if process.eq_ignore_ascii_case(EDGE_PROCESS) {
            edge_indices.push(i);
            edge_titles.push(
                win.get("title")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string(),
            );
        }
    }

    for &i in &edge_indices {
        let Some(entry) = windows[i].as_object_mut() else {
            continue;
        };
        if !entry.get("edge").map(Value::is_object).unwrap_or(false) {
            entry.insert(
                "edge".into(),
                json!({
                    "user_data_dir": "",
                    "profile_directory": "Default",
                    "cdp_window_id": 0,
                    "debug_port": 0,
                }),
            );
        }
        entry.insert("edge_tabs".into(), Value::Array(Vec::new()));
    }

    if edge_indices.is_empty() || tabs.is_empty() {
        return;
    }

    let mut rr = 0usize;
    for (title, url) in tabs {
        let slot = best_title_index(title, &edge_titles, &HashSet::new()).unwrap_or_else(|| {
            let s = rr % edge_indices.len();
            rr += 1;
            s
        });
        let Some(entry) = windows[edge_indices[slot]].as_object_mut() else {
            continue;
        };
        if let Some(list) = entry.get_mut("edge_tabs").and_then(Value::as_array_mut) {
            list.push(json!({ "title": title, "url": url }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(title: &str, process: &str) -> Value {
        json!({
            "title": title,
            "class_name": "Chrome_WidgetWin_1",
            "process_name": process,
            "exe": format!("C:\\apps\\{process}"),
            "rect": [0, 0, 800, 600],
            "normal_rect": [0, 0, 800, 600],
            "restore_rect": [0, 0, 800, 600],
            "show_cmd": 1,
            "z_order": 0,
        })
    }

    fn v1_with_browser_tabs() -> Value {
        json!({
            "schema": SCHEMA_V1,
            "created_at": "2026-01-01 10:00:00",
            "windows": [
                window("Mail - Microsoft Edge", "msedge.exe"),
                window("readme - Notepad", "notepad.exe"),
            ],
            "browser_tabs": {
                "msedge": {
                    "tabs": [
                        {"title": "Inbox", "url": "https://mail.test/inbox"},
                        {"title": "Calendar", "url": "https://mail.test/cal"},
                        {"title": "", "url": "  "},
                    ]
                }
            },
        })
    }

    #[test]
    fn v1_browser_tabs_move_onto_edge_windows() {
        let migrated = migrate(v1_with_browser_tabs()).unwrap();
        assert_eq!(migrated["schema"], SCHEMA);
        assert!(migrated.get("browser_tabs").is_none());
        let edge_tabs = migrated["windows"][0]["edge_tabs"].as_array().unwrap();
        assert_eq!(edge_tabs.len(), 2);
        assert_eq!(edge_tabs[0]["url"], "https://mail.test/inbox");
        // Non-edge windows stay untouched.
        assert!(migrated["windows"][1].get("edge_tabs").is_none());
        // Default edge metadata is synthesised.
        assert_eq!(migrated["windows"][0]["edge"]["profile_directory"], "Default");
    }

    #[test]
    fn v1_open_urls_variant_migrates_too() {
        let layout = json!({
            "schema": SCHEMA_V1,
            "windows": [window("Anything - Microsoft Edge", "msedge.exe")],
            "open_urls": { "msedge.exe": ["https://a.test", "https://b.test"] },
        });
        let migrated = migrate(layout).unwrap();
        assert!(migrated.get("open_urls").is_none());
        let tabs = migrated["windows"][0]["edge_tabs"].as_array().unwrap();
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[1]["url"], "https://b.test");
    }

    #[test]
    fn migration_is_idempotent() {
        let once = migrate(v1_with_browser_tabs()).unwrap();
        let twice = migrate(once.clone()).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn v2_passes_through_except_missing_ids() {
        let mut layout = migrate(v1_with_browser_tabs()).unwrap();
        // Strip one id to prove it gets re-ensured without other changes.
        layout["windows"][0]
            .as_object_mut()
            .unwrap()
            .remove("window_id");
        let migrated = migrate(layout.clone()).unwrap();
        assert!(!migrated["windows"][0]["window_id"]
            .as_str()
            .unwrap()
            .is_empty());
        assert_eq!(migrated["windows"][1], layout["windows"][1]);
    }

    #[test]
    fn unknown_schema_is_fatal() {
        let layout = json!({"schema": "winlayout.v7", "windows": []});
        assert!(matches!(
            migrate(layout),
            Err(LayoutError::SchemaUnsupported { .. })
        ));
        let layout = json!({"windows": []});
        assert!(matches!(
            migrate(layout),
            Err(LayoutError::SchemaUnsupported { .. })
        ));
    }

    #[test]
    fn malformed_records_are_rejected_at_the_boundary() {
        let layout = json!({
            "schema": SCHEMA,
            "windows": ["not a window"],
        });
        assert!(matches!(migrate(layout), Err(LayoutError::Malformed(_))));

        let layout = json!({
            "schema": SCHEMA,
            "windows": [{"title": "no rects at all"}],
        });
        assert!(matches!(migrate(layout), Err(LayoutError::Malformed(_))));
    }

    #[test]
    fn preserved_metadata_survives_migration() {
        let mut layout = v1_with_browser_tabs();
        layout
            .as_object_mut()
            .unwrap()
            .insert("speed_menu".into(), json!({"slots": 2}));
        let migrated = migrate(layout).unwrap();
        assert_eq!(migrated["speed_menu"]["slots"], 2);
    }

    #[test]
    fn tabs_without_title_round_robin_across_windows() {
        let layout = json!({
            "schema": SCHEMA_V1,
            "windows": [
                window("Alpha - Microsoft Edge", "msedge.exe"),
                window("Beta - Microsoft Edge", "msedge.exe"),
            ],
            "open_urls": { "msedge": ["https://1.test", "https://2.test", "https://3.test"] },
        });
        let migrated = migrate(layout).unwrap();
        let a = migrated["windows"][0]["edge_tabs"].as_array().unwrap().len();
        let b = migrated["windows"][1]["edge_tabs"].as_array().unwrap().len();
        assert_eq!(a + b, 3);
        assert_eq!(a, 2);
        assert_eq!(b, 1);
    }
}
