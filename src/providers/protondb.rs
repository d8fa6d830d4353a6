//! ProtonDB community compatibility gateway. One endpoint: the per-app
//! report summary, from which only the tier string is consumed.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::Value;

use super::http_client;

const PROTONDB_BASE: &str = "https://www.protondb.com";

#[derive(Debug, Clone)]
pub struct ProtonDbClient {
    base_url: String,
    http: Client,
}

impl ProtonDbClient {
    pub fn new() -> Self {
        Self {
            base_url: PROTONDB_BASE.to_string(),
            http: http_client("PROTONDB_HTTP_TIMEOUT_SECS"),
        }
    }

    /// Compatibility tier for one app. 404 means no reports yet; both that
    /// and a missing tier field read as Ok(None).
    pub async fn tier(&self, app_id: i64) -> Result<Option<String>> {
        let url = format!(
            "{}/api/v1/reports/summaries/{app_id}.json",
            self.base_url
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(anyhow!("protondb summary failed: {status} app_id={app_id}"));
        }
        let body: Value = resp.json().await?;
        Ok(body
            .get("tier")
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

impl Default for ProtonDbClient {
    fn default() -> Self {
        Self::new()
    }
}
