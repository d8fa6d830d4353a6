//! Steam storefront catalog gateway: app details, search listings, featured
//! categories and aggregated review stats. All endpoints are keyless.

use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::{http_client, truncate_for_log};

const STORE_BASE: &str = "https://store.steampowered.com";

#[derive(Debug, Clone)]
pub struct SteamStoreClient {
    base_url: String,
    http: Client,
}

/// Catalog entry as returned by /api/appdetails. `kind` is the raw `type`
/// field; anything other than "game" (dlc, music, tool) is skipped upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct AppDetails {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub steam_appid: i64,
    #[serde(default)]
    pub header_image: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub is_free: bool,
    #[serde(default)]
    pub price_overview: Option<PriceOverview>,
    pub platforms: Platforms,
    #[serde(default)]
    pub categories: Vec<DescriptionEntry>,
    #[serde(default)]
    pub genres: Vec<DescriptionEntry>,
    #[serde(default)]
    pub release_date: Option<ReleaseDate>,
}

impl AppDetails {
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.description.clone()).collect()
    }

    pub fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.description.clone()).collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceOverview {
    #[serde(rename = "final")]
    pub final_price: Option<i64>,
    #[serde(default)]
    pub discount_percent: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Platforms {
    #[serde(default)]
    pub windows: bool,
    #[serde(default)]
    pub mac: bool,
    #[serde(default)]
    pub linux: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DescriptionEntry {
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDate {
    #[serde(default)]
    pub coming_soon: bool,
    #[serde(default)]
    pub date: Option<String>,
}

/// Aggregated review stats; `None` when a title has no reviews at all.
#[derive(Debug, Clone, Copy)]
pub struct ReviewStats {
    pub total: i64,
    pub positive: i64,
}

impl ReviewStats {
    /// Positivity percentage, rounded.
    pub fn score(&self) -> i32 {
        ((self.positive as f64 / self.total as f64) * 100.0).round() as i32
    }
}

impl SteamStoreClient {
    pub fn new() -> Self {
        Self {
            base_url: STORE_BASE.to_string(),
            http: http_client("STEAM_HTTP_TIMEOUT_SECS"),
        }
    }

    /// Full catalog details for one app. Ok(None) when the storefront has no
    /// entry (unlisted/delisted apps report success=false).
    pub async fn app_details(&self, app_id: i64) -> Result<Option<AppDetails>> {
        let url = format!("{}/api/appdetails?appids={app_id}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("appdetails failed: {status} app_id={app_id}"));
        }
        let body: Value = resp.json().await?;
        let entry = &body[app_id.to_string()];
        if entry.get("success").and_then(Value::as_bool) != Some(true) {
            return Ok(None);
        }
        let Some(data) = entry.get("data") else {
            return Ok(None);
        };
        let details: AppDetails = serde_json::from_value(data.clone())
            .map_err(|e| anyhow!("appdetails shape mismatch for {app_id}: {e}"))?;
        Ok(Some(details))
    }

    /// App ids from a named search listing (globaltopsellers, topsellers,
    /// popularnew, popularcomingsoon). The endpoint returns JSON-wrapped
    /// HTML; ids are scraped out of data-ds-appid attributes.
    pub async fn search_app_ids(&self, filter: &str, count: u32) -> Result<Vec<i64>> {
        let url = format!(
            "{}/search/results/?sort_by=_ASC&ignore_preferences=1&filter={}&infinite=1&count={count}",
            self.base_url,
            urlencoding::encode(filter),
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("search listing failed: {status} filter={filter}"));
        }
        let body: Value = resp.json().await?;
        let html = body
            .get("results_html")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let re = Regex::new(r#"data-ds-appid="(\d+)""#).expect("static regex");
        let ids = re
            .captures_iter(html)
            .filter_map(|c| c[1].parse::<i64>().ok())
            .collect();
        Ok(ids)
    }

    /// App ids from every featured category block on the storefront front
    /// page. The response shape is a loose map; anything without items is
    /// skipped.
    pub async fn featured_category_app_ids(&self) -> Result<Vec<i64>> {
        let url = format!("{}/api/featuredcategories/", self.base_url);
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("featuredcategories failed: {status}"));
        }
        let body: Value = resp.json().await?;
        let mut ids = Vec::new();
        if let Some(obj) = body.as_object() {
            for category in obj.values() {
                let Some(items) = category.get("items").and_then(Value::as_array) else {
                    continue;
                };
                for item in items {
                    if let Some(id) = item.get("id").and_then(Value::as_i64) {
                        ids.push(id);
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Review summary across all languages and purchase types. Ok(None) when
    /// the summary is missing or reports zero reviews.
    pub async fn app_reviews(&self, app_id: i64) -> Result<Option<ReviewStats>> {
        let url = format!(
            "{}/appreviews/{app_id}?json=1&language=all&purchase_type=all",
            self.base_url
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 500);
            return Err(anyhow!("appreviews failed: {status} app_id={app_id} body={body}"));
        }
        let body: Value = resp.json().await?;
        let Some(summary) = body.get("query_summary") else {
            return Ok(None);
        };
        let total = summary
            .get("total_reviews")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        if total == 0 {
            return Ok(None);
        }
        let positive = summary
            .get("total_positive")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(Some(ReviewStats { total, positive }))
    }
}

impl Default for SteamStoreClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn review_score_rounds() {
        let stats = ReviewStats { total: 3, positive: 2 };
        assert_eq!(stats.score(), 67);
        let stats = ReviewStats { total: 10, positive: 9 };
        assert_eq!(stats.score(), 90);
    }

    #[test]
    fn appdetails_decodes_minimal_entry() {
        let data = serde_json::json!({
            "type": "game",
            "name": "Test Game",
            "steam_appid": 440,
            "is_free": true,
            "platforms": { "windows": true, "mac": false, "linux": true },
        });
        let details: AppDetails = serde_json::from_value(data).unwrap();
        assert_eq!(details.kind, "game");
        assert!(details.is_free);
        assert!(details.platforms.linux);
        assert!(details.categories.is_empty());
        assert!(details.price_overview.is_none());
    }
}
