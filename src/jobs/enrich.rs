//! The per-item enrichment pipeline shared by discovery, library sync and
//! (optionally) trending: catalog details, compatibility tier, review stats,
//! community tags, inferred capabilities and normalized pricing, combined
//! into one canonical row.

use chrono::NaiveDate;
use tracing::warn;

use crate::engine::score::{infer_max_players, review_label};
use crate::providers::protondb::ProtonDbClient;
use crate::providers::steam_store::SteamStoreClient;
use crate::providers::steamspy::SteamSpyClient;
use crate::store::models::{GameUpsert, ProtonTier};

/// Capability categories that mark a title as playable together.
const MULTIPLAYER_CATEGORIES: [&str; 7] = [
    "Multi-player",
    "Online Multi-Player",
    "Co-op",
    "Online Co-op",
    "LAN Co-op",
    "Shared/Split Screen Co-op",
    "Shared/Split Screen",
];

pub struct EnrichmentClients {
    pub store: SteamStoreClient,
    pub protondb: ProtonDbClient,
    pub steamspy: SteamSpyClient,
}

impl EnrichmentClients {
    pub fn new() -> Self {
        Self {
            store: SteamStoreClient::new(),
            protondb: ProtonDbClient::new(),
            steamspy: SteamSpyClient::new(),
        }
    }
}

impl Default for EnrichmentClients {
    fn default() -> Self {
        Self::new()
    }
}

pub enum EnrichOutcome {
    Ready(Box<GameUpsert>),
    Skipped { name: String, reason: String },
}

/// Enrich one app id. Never fails: a missing catalog entry or a non-game
/// type yields `Skipped`, and every secondary gateway degrades to "no data".
pub async fn enrich_app(clients: &EnrichmentClients, app_id: i64) -> EnrichOutcome {
    let details = match clients.store.app_details(app_id).await {
        Ok(Some(details)) => details,
        Ok(None) => {
            return EnrichOutcome::Skipped {
                name: "Unknown".into(),
                reason: "no data".into(),
            }
        }
        Err(e) => {
            warn!(app_id, error = %e, "appdetails fetch failed");
            return EnrichOutcome::Skipped {
                name: "Unknown".into(),
                reason: "no data".into(),
            };
        }
    };
    if details.kind != "game" {
        return EnrichOutcome::Skipped {
            name: details.name,
            reason: details.kind,
        };
    }

    let categories = details.category_names();
    let genres = details.genre_names();

    // Native Linux short-circuits the community rating; otherwise ask
    // ProtonDB and force "native" is impossible by construction.
    let proton_rating = if details.platforms.linux {
        Some("native".to_string())
    } else {
        match clients.protondb.tier(app_id).await {
            Ok(tier) => tier,
            Err(e) => {
                warn!(app_id, error = %e, "protondb fetch failed");
                None
            }
        }
    };
    let supports_linux =
        details.platforms.linux || ProtonTier::parse(proton_rating.as_deref()).linux_ok();

    let reviews = match clients.store.app_reviews(app_id).await {
        Ok(reviews) => reviews,
        Err(e) => {
            warn!(app_id, error = %e, "review fetch failed");
            None
        }
    };
    let review_score = reviews.map(|r| r.score());

    // SteamSpy tags are the primary tag source; catalog genres are the
    // fallback when it has nothing.
    let tags = match clients.steamspy.app_tags(app_id).await {
        Ok(Some(tags)) => tags,
        Ok(None) => genres,
        Err(e) => {
            warn!(app_id, error = %e, "steamspy tags fetch failed");
            genres
        }
    };

    let price_cents = if details.is_free {
        Some(0)
    } else {
        details
            .price_overview
            .as_ref()
            .and_then(|p| p.final_price)
    };
    let sale_percent = details
        .price_overview
        .as_ref()
        .and_then(|p| p.discount_percent);

    let (release_date, is_coming_soon) = match &details.release_date {
        Some(rd) => (
            rd.date.as_deref().and_then(parse_release_date),
            rd.coming_soon,
        ),
        None => (None, false),
    };

    EnrichOutcome::Ready(Box::new(GameUpsert {
        steam_app_id: app_id,
        name: details.name,
        header_image_url: details.header_image,
        description: details.short_description,
        is_multiplayer: categories
            .iter()
            .any(|c| MULTIPLAYER_CATEGORIES.contains(&c.as_str())),
        max_players: infer_max_players(&categories, &tags),
        supports_linux,
        protondb_rating: proton_rating,
        steam_review_score: review_score,
        steam_review_desc: review_score.map(|s| review_label(s).to_string()),
        steam_review_count: reviews.map(|r| r.total as i32),
        steam_price_cents: price_cents,
        is_free: details.is_free,
        is_on_sale: sale_percent.unwrap_or(0) > 0,
        sale_percent,
        release_date,
        is_coming_soon,
        steam_tags: tags,
        categories,
    }))
}

/// Parse the storefront's free-text release date ("21 Oct, 2020",
/// "Oct 21, 2020", sometimes just a year) into a calendar date.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in ["%d %b, %Y", "%b %d, %Y", "%d %B, %Y", "%B %d, %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    // Year-only announcements ("2026") pin to Jan 1.
    if let Ok(year) = raw.parse::<i32>() {
        return NaiveDate::from_ymd_opt(year, 1, 1);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_storefront_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2020, 12, 21).unwrap();
        assert_eq!(parse_release_date("Dec 21, 2020"), Some(expected));
        assert_eq!(parse_release_date("21 Dec, 2020"), Some(expected));
        assert_eq!(parse_release_date("December 21, 2020"), Some(expected));
        assert_eq!(
            parse_release_date("2026"),
            NaiveDate::from_ymd_opt(2026, 1, 1)
        );
    }

    #[test]
    fn unparsable_dates_are_none() {
        assert_eq!(parse_release_date("Coming soon"), None);
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("To be announced"), None);
    }
}
