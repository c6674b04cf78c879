// winlayout — Save & Restore Windows Desktop Layouts
// Copyright (C) 2026  Martin Gehrken (IamLumae)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Chrome DevTools Protocol client for Edge debug sessions.
//!
//! Consumed, never produced: GET `/json/version` for liveness, GET
//! `/json/list` for open targets, PUT `/json/new` to open a URL in a
//! specific window. The endpoint only listens on localhost.

use std::time::Duration;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::LayoutError;

pub const DEFAULT_DEBUG_PORT: u16 = 9222;

const LIVENESS_TIMEOUT: Duration = Duration::from_millis(1000);
const REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);

/// One page target from `/json/list`. `window_id` is `None` when Edge
/// reported -1/0 ("unknown window") or nothing at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdpTab {
    pub title: String,
    pub url: String,
    pub window_id: Option<i64>,
}

fn client(timeout: Duration) -> Option<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .ok()
}

/// True when a debug endpoint answers on the port.
pub fn endpoint_alive(port: u16) -> bool {
    let Some(client) = client(LIVENESS_TIMEOUT) else {
        return false;
    };
    let url = format!("http://127.0.0.1:{port}/json/version");
    match client.get(&url).send() {
        Ok(resp) => resp.status().is_success(),
        Err(_) => false,
    }
}

/// Filter raw `/json/list` descriptors down to restorable page tabs.
///
/// Kept: `type == "page"` with a non-empty url that is not an internal
/// scheme. CDP windowId is only trusted when it is a real positive
/// integer — Edge sometimes returns -1 or 0 meaning "unknown window".
pub fn page_tabs(items: &[Value]) -> Vec<CdpTab> {
    let mut tabs = Vec::new();
    for item in items {
        if item.get("type").and_then(Value::as_str) != Some("page") {
            continue;
        }
        let url = item
            .get("url")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_string();
        if url.is_empty() || url.starts_with("edge://") || url.starts_with("chrome://") {
            continue;
        }
        let window_id = item
            .get("windowId")
            .and_then(Value::as_i64)
            .filter(|wid| *wid > 0);
        tabs.push(CdpTab {
            title: item
                .get("title")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim()
                .to_string(),
            url,
            window_id,
        });
    }
    tabs
}

/// Fetch page tabs from a live debug endpoint.
pub fn fetch_tabs(port: u16) -> Result<Vec<CdpTab>, LayoutError> {
    let client = client(REQUEST_TIMEOUT).ok_or(LayoutError::ProtocolUnreachable(port))?;
    let url = format!("http://127.0.0.1:{port}/json/list");
    let items: Vec<Value> = client
        .get(&url)
        .send()
        .and_then(|r| r.json())
        .map_err(|e| {
            warn!(port, error = %e, "CDP list failed");
            LayoutError::ProtocolUnreachable(port)
        })?;
    let tabs = page_tabs(&items);
    debug!(port, count = tabs.len(), "fetched CDP tabs");
    Ok(tabs)
}

/// Open a URL in a specific Edge window via Target.createTarget.
///
/// Only works while a debug session is live on the port; the caller falls
/// back to a plain profile launch when this returns false.
pub fn open_tab_in_window(port: u16, cdp_window_id: i64, url: &str) -> bool {
    let Some(client) = client(REQUEST_TIMEOUT) else {
        return false;
    };
    let endpoint = format!("http://127.0.0.1:{port}/json/new");
    let payload = json!({
        "id": 1,
        "method": "Target.createTarget",
        "params": { "url": url, "windowId": cdp_window_id },
    });
    match client.put(&endpoint).json(&payload).send() {
        Ok(resp) if resp.status().is_success() => true,
        Ok(resp) => {
            debug!(port, status = %resp.status(), "CDP open-tab rejected");
            false
        }
        Err(e) => {
            debug!(port, error = %e, "CDP open-tab failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_tabs_keeps_only_restorable_pages() {
        let items = vec![
            json!({"type": "page", "title": "Docs", "url": "https://example.com/docs", "windowId": 5}),
            json!({"type": "background_page", "url": "https://example.com/bg"}),
            json!({"type": "page", "url": "edge://settings"}),
            json!({"type": "page", "url": "chrome://history"}),
            json!({"type": "page", "url": "   "}),
            json!({"type": "page", "url": "https://example.com/plain"}),
        ];
        let tabs = page_tabs(&items);
        assert_eq!(tabs.len(), 2);
        assert_eq!(tabs[0].url, "https://example.com/docs");
        assert_eq!(tabs[0].window_id, Some(5));
        assert_eq!(tabs[1].window_id, None);
    }

    #[test]
    fn non_positive_window_ids_are_absent() {
        let items = vec![
            json!({"type": "page", "url": "https://a.test", "windowId": -1}),
            json!({"type": "page", "url": "https://b.test", "windowId": 0}),
            json!({"type": "page", "url": "https://c.test", "windowId": "7"}),
            json!({"type": "page", "url": "https://d.test", "windowId": 7}),
        ];
        let tabs = page_tabs(&items);
        assert_eq!(tabs.len(), 4);
        assert_eq!(tabs[0].window_id, None);
        assert_eq!(tabs[1].window_id, None);
        assert_eq!(tabs[2].window_id, None);
        assert_eq!(tabs[3].window_id, Some(7));
    }

    #[test]
    fn titles_default_to_empty() {
        let items = vec![json!({"type": "page", "url": "https://a.test"})];
        let tabs = page_tabs(&items);
        assert_eq!(tabs[0].title, "");
    }
}
