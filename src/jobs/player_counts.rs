//! Live concurrent-player rotation. Works through the games table stalest
//! check first; a gateway miss stamps the check timestamp without touching
//! the count, so the rotation keeps advancing past unavailable titles
//! instead of retrying them every run.

use futures::future::join_all;
use serde::Serialize;
use tracing::warn;

use crate::providers::steam_web::SteamWebClient;
use crate::store::Db;
use crate::util::env::env_parse;

const DEFAULT_BATCH_SIZE: i64 = 50;
/// Concurrent requests per chunk; the counter endpoint is keyless but still
/// not worth hammering.
const CHUNK_SIZE: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct PlayerCountSummary {
    pub success: bool,
    pub processed: usize,
    pub updated: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn run(db: &Db) -> PlayerCountSummary {
    let mut summary = PlayerCountSummary {
        success: false,
        processed: 0,
        updated: 0,
        error: None,
    };

    let log_id = match db.open_sync_log("player_counts").await {
        Ok(id) => id,
        Err(e) => {
            summary.error = Some(e.to_string());
            return summary;
        }
    };

    let (status, error) = match run_inner(db, &mut summary).await {
        Ok(()) => ("success", None),
        Err(e) => {
            warn!(error = %e, "player-count sync failed");
            ("error", Some(e.to_string()))
        }
    };
    summary.success = status == "success";
    summary.error = error.clone();

    if let Err(e) = db
        .close_sync_log(log_id, status, error.as_deref(), summary.updated)
        .await
    {
        summary.success = false;
        summary.error = Some(e.to_string());
    }
    summary
}

async fn run_inner(db: &Db, summary: &mut PlayerCountSummary) -> anyhow::Result<()> {
    let batch_size: i64 = env_parse("PLAYER_COUNT_BATCH_SIZE", DEFAULT_BATCH_SIZE);
    let worklist = db.player_count_worklist(batch_size).await?;
    summary.processed = worklist.len();
    if worklist.is_empty() {
        return Ok(());
    }

    let steam = SteamWebClient::from_env();
    for chunk in worklist.chunks(CHUNK_SIZE) {
        let counts = join_all(chunk.iter().map(|item| steam.current_players(item.steam_app_id)))
            .await;
        for (item, count) in chunk.iter().zip(counts) {
            match count {
                Ok(Some(count)) => {
                    db.set_current_players(item.id, count).await?;
                    summary.updated += 1;
                }
                Ok(None) => db.touch_player_count_checked(item.id).await?,
                Err(e) => {
                    warn!(app_id = item.steam_app_id, error = %e, "player count fetch failed");
                    db.touch_player_count_checked(item.id).await?;
                }
            }
        }
    }

    Ok(())
}
