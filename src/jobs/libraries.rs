//! Library sync: pull every configured player's owned-games list, enrich
//! titles the store has never seen, then upsert one ownership edge per
//! (player, game) pair observed — for ALL owned games, not just new ones,
//! because ownership changes for already-cataloged titles too. Finishes
//! with a best-effort avatar refresh.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{info, warn};

use super::enrich::{enrich_app, EnrichOutcome, EnrichmentClients};
use super::STORE_API_DELAY;
use crate::providers::steam_web::SteamWebClient;
use crate::store::Db;

#[derive(Debug, Clone, Serialize)]
pub struct LibrarySyncSummary {
    pub success: bool,
    pub games_updated: i32,
    pub total_owned: usize,
    pub new_games: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct OwnedEntry {
    playtime_hours: f64,
    last_played_at: Option<DateTime<Utc>>,
}

pub async fn run(db: &Db) -> LibrarySyncSummary {
    let mut summary = LibrarySyncSummary {
        success: false,
        games_updated: 0,
        total_owned: 0,
        new_games: 0,
        error: None,
    };

    let log_id = match db.open_sync_log("libraries").await {
        Ok(id) => id,
        Err(e) => {
            summary.error = Some(e.to_string());
            return summary;
        }
    };

    let (status, error) = match run_inner(db, &mut summary).await {
        Ok(()) => ("success", None),
        Err(e) => {
            warn!(error = %e, "library sync failed");
            ("error", Some(e.to_string()))
        }
    };
    summary.success = status == "success";
    summary.error = error.clone();

    if let Err(e) = db
        .close_sync_log(log_id, status, error.as_deref(), summary.games_updated)
        .await
    {
        summary.success = false;
        summary.error = Some(e.to_string());
    }
    summary
}

async fn run_inner(db: &Db, summary: &mut LibrarySyncSummary) -> anyhow::Result<()> {
    let players = db.fetch_players().await?;
    if players.is_empty() {
        anyhow::bail!("no players configured");
    }

    let steam = SteamWebClient::from_env();

    // app id -> per-player ownership observed this run
    let mut owned: HashMap<i64, HashMap<i64, OwnedEntry>> = HashMap::new();
    for player in &players {
        let games = steam.owned_games(&player.steam_id).await?;
        info!(player = %player.name, owned = games.len(), "fetched library");
        for game in games {
            owned.entry(game.appid).or_default().insert(
                player.id,
                OwnedEntry {
                    playtime_hours: game.playtime_hours(),
                    last_played_at: (game.rtime_last_played > 0)
                        .then(|| Utc.timestamp_opt(game.rtime_last_played, 0).single())
                        .flatten(),
                },
            );
        }
    }
    summary.total_owned = owned.len();

    // Enrich only the titles the store has never seen.
    let existing = db.existing_app_ids().await?;
    let new_app_ids: Vec<i64> = owned
        .keys()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect();
    summary.new_games = new_app_ids.len();

    let clients = EnrichmentClients::new();
    for app_id in &new_app_ids {
        tokio::time::sleep(STORE_API_DELAY).await;
        match enrich_app(&clients, *app_id).await {
            EnrichOutcome::Ready(game) => {
                if db.upsert_game(&game).await.is_ok() {
                    summary.games_updated += 1;
                }
            }
            EnrichOutcome::Skipped { name, reason } => {
                info!(app_id, name = %name, reason = %reason, "skipped owned title");
            }
        }
    }

    // Ownership edges for everything observed, new or already cataloged.
    let app_index = db.app_id_index().await?;
    for (app_id, owners) in &owned {
        let Some(game_id) = app_index.get(app_id) else {
            continue;
        };
        for (player_id, entry) in owners {
            db.upsert_player_game(*player_id, *game_id, entry.playtime_hours, entry.last_played_at)
                .await?;
        }
    }

    // Avatar refresh is cosmetic; failures never affect job status.
    for player in &players {
        match steam.avatar_url(&player.steam_id).await {
            Ok(Some(url)) => {
                if let Err(e) = db.update_player_avatar(player.id, &url).await {
                    warn!(player = %player.name, error = %e, "avatar write failed");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(player = %player.name, error = %e, "avatar fetch failed"),
        }
    }

    Ok(())
}
