//! Steam Web API gateway: per-account owned-games lists, profile summaries
//! and the keyless concurrent-player counter.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use super::http_client;
use crate::util::env::env_opt;

const WEB_API_BASE: &str = "https://api.steampowered.com";

#[derive(Debug, Clone)]
pub struct SteamWebClient {
    base_url: String,
    http: Client,
    api_key: Option<String>,
}

/// One owned title from GetOwnedGames. Playtime is minutes-granularity.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnedGame {
    pub appid: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub playtime_forever: i64,
    #[serde(default)]
    pub rtime_last_played: i64,
}

impl OwnedGame {
    /// Cumulative playtime in hours, rounded to 2 decimals.
    pub fn playtime_hours(&self) -> f64 {
        ((self.playtime_forever as f64 / 60.0) * 100.0).round() / 100.0
    }
}

impl SteamWebClient {
    pub fn from_env() -> Self {
        Self {
            base_url: WEB_API_BASE.to_string(),
            http: http_client("STEAM_HTTP_TIMEOUT_SECS"),
            api_key: env_opt("STEAM_API_KEY"),
        }
    }

    fn key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| anyhow!("STEAM_API_KEY is not configured"))
    }

    /// Full owned-games list for one account, played free games included.
    pub async fn owned_games(&self, steam_id: &str) -> Result<Vec<OwnedGame>> {
        let url = format!(
            "{}/IPlayerService/GetOwnedGames/v1/?key={}&steamid={steam_id}&include_appinfo=1&include_played_free_games=1&format=json",
            self.base_url,
            self.key()?,
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GetOwnedGames failed for {steam_id}: {status}"));
        }
        let body: Value = resp.json().await?;
        let games = body
            .get("response")
            .and_then(|r| r.get("games"))
            .cloned()
            .unwrap_or(Value::Array(vec![]));
        let games: Vec<OwnedGame> = serde_json::from_value(games)
            .map_err(|e| anyhow!("GetOwnedGames shape mismatch for {steam_id}: {e}"))?;
        Ok(games)
    }

    /// Medium avatar URL from the profile summary, if the profile is visible.
    pub async fn avatar_url(&self, steam_id: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/ISteamUser/GetPlayerSummaries/v2/?key={}&steamids={steam_id}",
            self.base_url,
            self.key()?,
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GetPlayerSummaries failed for {steam_id}: {status}"));
        }
        let body: Value = resp.json().await?;
        let avatar = body
            .get("response")
            .and_then(|r| r.get("players"))
            .and_then(Value::as_array)
            .and_then(|players| players.first())
            .and_then(|p| p.get("avatarmedium"))
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(avatar)
    }

    /// Live concurrent-player count. Keyless; result != 1 means the counter
    /// is unavailable for this app (delisted, tooling, etc.).
    pub async fn current_players(&self, app_id: i64) -> Result<Option<i32>> {
        let url = format!(
            "{}/ISteamUserStats/GetNumberOfCurrentPlayers/v1/?appid={app_id}",
            self.base_url
        );
        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("GetNumberOfCurrentPlayers failed: {status} app_id={app_id}"));
        }
        let body: Value = resp.json().await?;
        let response = body.get("response").cloned().unwrap_or(Value::Null);
        if response.get("result").and_then(Value::as_i64) != Some(1) {
            return Ok(None);
        }
        let count = response
            .get("player_count")
            .and_then(Value::as_i64)
            .map(|n| n as i32);
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playtime_minutes_to_hours_two_decimals() {
        let g = OwnedGame {
            appid: 1,
            name: None,
            playtime_forever: 90,
            rtime_last_played: 0,
        };
        assert_eq!(g.playtime_hours(), 1.5);
        let g = OwnedGame {
            appid: 1,
            name: None,
            playtime_forever: 100,
            rtime_last_played: 0,
        };
        assert_eq!(g.playtime_hours(), 1.67);
    }
}
