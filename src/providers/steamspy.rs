//! SteamSpy community aggregator: popularity top-lists and per-app store
//! tags. Free-form JSON, navigated defensively.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;

use super::http_client;

const STEAMSPY_BASE: &str = "https://steamspy.com/api.php";

#[derive(Debug, Clone)]
pub struct SteamSpyClient {
    base_url: String,
    http: Client,
}

/// One entry from a SteamSpy top-list.
#[derive(Debug, Clone)]
pub struct SpyEntry {
    pub app_id: i64,
    pub name: String,
    pub average_2weeks: i64,
    pub ccu: i64,
}

impl SteamSpyClient {
    pub fn new() -> Self {
        Self {
            base_url: STEAMSPY_BASE.to_string(),
            http: http_client("STEAMSPY_HTTP_TIMEOUT_SECS"),
        }
    }

    async fn request(&self, query: &str) -> Result<Value> {
        let url = format!("{}?{query}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("steamspy request failed: {status} query={query}"));
        }
        Ok(resp.json().await?)
    }

    /// Top 100 by players over the last two weeks, unsorted as delivered.
    pub async fn top_two_weeks(&self) -> Result<Vec<SpyEntry>> {
        let body = self.request("request=top100in2weeks").await?;
        let Some(obj) = body.as_object() else {
            return Err(anyhow!("unexpected top100in2weeks shape (expected object)"));
        };
        let mut entries = Vec::with_capacity(obj.len());
        for (key, v) in obj {
            let app_id = v
                .get("appid")
                .and_then(Value::as_i64)
                .or_else(|| key.parse::<i64>().ok());
            let Some(app_id) = app_id else { continue };
            entries.push(SpyEntry {
                app_id,
                name: v
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string(),
                average_2weeks: v.get("average_2weeks").and_then(Value::as_i64).unwrap_or(0),
                ccu: v.get("ccu").and_then(Value::as_i64).unwrap_or(0),
            });
        }
        Ok(entries)
    }

    /// Top 100 by all-time owners; only the ids matter for discovery.
    pub async fn top_owned_app_ids(&self) -> Result<Vec<i64>> {
        let body = self.request("request=top100forever").await?;
        let Some(obj) = body.as_object() else {
            return Err(anyhow!("unexpected top100forever shape (expected object)"));
        };
        Ok(obj.keys().filter_map(|k| k.parse::<i64>().ok()).collect())
    }

    /// Store tags for one app, capped to the 10 highest-voted. Ok(None) when
    /// SteamSpy has no tag data (callers fall back to catalog genres).
    pub async fn app_tags(&self, app_id: i64) -> Result<Option<Vec<String>>> {
        let body = self.request(&format!("request=appdetails&appid={app_id}")).await?;
        let Some(tags) = body.get("tags").and_then(Value::as_object) else {
            return Ok(None);
        };
        if tags.is_empty() {
            return Ok(None);
        }
        let mut ranked: Vec<(&String, i64)> = tags
            .iter()
            .map(|(name, votes)| (name, votes.as_i64().unwrap_or(0)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(Some(
            ranked.into_iter().take(10).map(|(name, _)| name.clone()).collect(),
        ))
    }
}

impl Default for SteamSpyClient {
    fn default() -> Self {
        Self::new()
    }
}
