use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Community compatibility rating for running a title on Linux, ordered from
/// best to worst. Anything the gateway reports that we do not recognize
/// (e.g. "pending") lands on `Unrated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtonTier {
    Unrated,
    Borked,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Native,
}

impl ProtonTier {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("native") => ProtonTier::Native,
            Some("platinum") => ProtonTier::Platinum,
            Some("gold") => ProtonTier::Gold,
            Some("silver") => ProtonTier::Silver,
            Some("bronze") => ProtonTier::Bronze,
            Some("borked") => ProtonTier::Borked,
            _ => ProtonTier::Unrated,
        }
    }

    /// Tiers counted as "runs well enough on Linux" for the support boolean.
    pub fn linux_ok(self) -> bool {
        self >= ProtonTier::Silver
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Player {
    pub id: i64,
    pub name: String,
    pub steam_id: String,
    pub profile_url: Option<String>,
    pub avatar_url: Option<String>,
    pub is_primary: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub steam_app_id: i64,
    pub name: String,
    pub header_image_url: Option<String>,
    pub description: Option<String>,
    pub is_multiplayer: bool,
    pub max_players: Option<i32>,
    pub supports_linux: bool,
    pub protondb_rating: Option<String>,
    pub servers_deprecated: bool,
    pub steam_review_score: Option<i32>,
    pub steam_review_desc: Option<String>,
    pub steam_review_count: Option<i32>,
    pub opencritic_score: Option<i32>,
    pub opencritic_tier: Option<String>,
    pub steam_price_cents: Option<i64>,
    pub best_price_cents: Option<i64>,
    pub best_price_store: Option<String>,
    pub best_price_url: Option<String>,
    pub is_free: bool,
    pub is_on_sale: bool,
    pub sale_percent: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub is_coming_soon: bool,
    pub steam_tags: Vec<String>,
    pub categories: Vec<String>,
    pub trending_score: Option<i32>,
    pub current_players: Option<i32>,
    pub player_count_updated_at: Option<DateTime<Utc>>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Game {
    pub fn proton_tier(&self) -> ProtonTier {
        ProtonTier::parse(self.protondb_rating.as_deref())
    }

    /// Best known price in minor units: third-party deal first, storefront
    /// list price second. Free games are 0; None means no price data at all.
    pub fn effective_price_cents(&self) -> Option<i64> {
        if self.is_free {
            return Some(0);
        }
        self.best_price_cents.or(self.steam_price_cents)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlayerGame {
    pub id: i64,
    pub player_id: i64,
    pub game_id: i64,
    pub playtime_hours: f64,
    pub last_played_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SyncLog {
    pub id: i64,
    pub sync_type: String,
    pub status: String,
    pub error: Option<String>,
    pub games_updated: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Full row shape written by the enrichment path. Every field is freshly
/// fetched when this is built, so the whole-row upsert can never erase data
/// another job owns.
#[derive(Debug, Clone, Serialize)]
pub struct GameUpsert {
    pub steam_app_id: i64,
    pub name: String,
    pub header_image_url: Option<String>,
    pub description: Option<String>,
    pub is_multiplayer: bool,
    pub max_players: Option<i32>,
    pub supports_linux: bool,
    pub protondb_rating: Option<String>,
    pub steam_review_score: Option<i32>,
    pub steam_review_desc: Option<String>,
    pub steam_review_count: Option<i32>,
    pub steam_price_cents: Option<i64>,
    pub is_free: bool,
    pub is_on_sale: bool,
    pub sale_percent: Option<i32>,
    pub release_date: Option<NaiveDate>,
    pub is_coming_soon: bool,
    pub steam_tags: Vec<String>,
    pub categories: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proton_tier_ordering() {
        assert!(ProtonTier::Native > ProtonTier::Platinum);
        assert!(ProtonTier::Platinum > ProtonTier::Gold);
        assert!(ProtonTier::Gold > ProtonTier::Silver);
        assert!(ProtonTier::Silver > ProtonTier::Bronze);
        assert!(ProtonTier::Bronze > ProtonTier::Borked);
        assert!(ProtonTier::Borked > ProtonTier::Unrated);
    }

    #[test]
    fn proton_tier_parse_unknown() {
        assert_eq!(ProtonTier::parse(Some("pending")), ProtonTier::Unrated);
        assert_eq!(ProtonTier::parse(None), ProtonTier::Unrated);
        assert_eq!(ProtonTier::parse(Some("Gold")), ProtonTier::Gold);
    }

    #[test]
    fn linux_ok_cutoff_is_silver() {
        assert!(ProtonTier::Native.linux_ok());
        assert!(ProtonTier::Silver.linux_ok());
        assert!(!ProtonTier::Bronze.linux_ok());
        assert!(!ProtonTier::Unrated.linux_ok());
    }
}
