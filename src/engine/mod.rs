//! The client-side data pipeline: ownership aggregation, recommendation
//! scoring, the layered filter chain, the multi-key sort stack, the
//! shortlist/exclusion registers and the per-tab configuration resolver.
//! Everything here is pure and recomputed on demand; nothing mutates its
//! inputs or talks to the network.

pub mod config;
pub mod filters;
pub mod ownership;
pub mod registers;
pub mod score;
pub mod sort;
pub mod view;

#[cfg(test)]
pub(crate) mod testutil {
    use crate::store::models::{Game, Player, PlayerGame};
    use chrono::{TimeZone, Utc};

    pub fn game(id: i64, name: &str) -> Game {
        Game {
            id,
            steam_app_id: 1000 + id,
            name: name.to_string(),
            header_image_url: None,
            description: None,
            is_multiplayer: true,
            max_players: None,
            supports_linux: true,
            protondb_rating: None,
            servers_deprecated: false,
            steam_review_score: None,
            steam_review_desc: None,
            steam_review_count: None,
            opencritic_score: None,
            opencritic_tier: None,
            steam_price_cents: None,
            best_price_cents: None,
            best_price_url: None,
            best_price_store: None,
            is_free: false,
            is_on_sale: false,
            sale_percent: None,
            release_date: None,
            is_coming_soon: false,
            steam_tags: vec![],
            categories: vec![],
            trending_score: None,
            current_players: None,
            player_count_updated_at: None,
            last_updated_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn player(id: i64, name: &str) -> Player {
        Player {
            id,
            name: name.to_string(),
            steam_id: format!("7656119{id:010}"),
            profile_url: None,
            avatar_url: None,
            is_primary: true,
            last_synced_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    pub fn edge(id: i64, player_id: i64, game_id: i64, hours: f64) -> PlayerGame {
        PlayerGame {
            id,
            player_id,
            game_id,
            playtime_hours: hours,
            last_played_at: None,
        }
    }
}
