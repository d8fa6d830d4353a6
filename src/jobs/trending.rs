//! Trending sync: wipe all trending scores, re-derive them from the ranked
//! external "most played" list, then hand a smaller score band to
//! niche-but-active titles the ranked list missed.

use serde::Serialize;
use tracing::{info, warn};

use super::enrich::{enrich_app, EnrichOutcome, EnrichmentClients};
use super::STORE_API_DELAY;
use crate::providers::steamspy::SteamSpyClient;
use crate::store::Db;
use crate::util::env::env_flag;

/// Secondary-band threshold: live players needed for an unranked game to
/// keep some trending visibility.
const NICHE_MIN_PLAYERS: i32 = 1000;
const NICHE_BAND_SIZE: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct TrendingSyncSummary {
    pub success: bool,
    pub games_updated: i32,
    pub ranked: usize,
    pub boosted: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Rank 1 scores 100, each rung down loses a point, floored at 1.
pub fn rank_score(rank_index: usize) -> i32 {
    (100 - rank_index as i32).max(1)
}

/// Secondary band for unranked-but-active games: 50 down to 1, two ranks
/// per point.
pub fn niche_score(rank_index: usize) -> i32 {
    (50 - (rank_index as i32) / 2).max(1)
}

pub async fn run(db: &Db) -> TrendingSyncSummary {
    let mut summary = TrendingSyncSummary {
        success: false,
        games_updated: 0,
        ranked: 0,
        boosted: 0,
        error: None,
    };

    let log_id = match db.open_sync_log("trending").await {
        Ok(id) => id,
        Err(e) => {
            summary.error = Some(e.to_string());
            return summary;
        }
    };

    let (status, error) = match run_inner(db, &mut summary).await {
        Ok(()) => ("success", None),
        Err(e) => {
            warn!(error = %e, "trending sync failed");
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

async fn run_inner(db: &Db, summary: &mut TrendingSyncSummary) -> anyhow::Result<()> {
    let spy = SteamSpyClient::new();
    // The ranked list is this job's worklist; without it there is nothing
    // to derive, so failure here is fatal.
    let mut top = spy.top_two_weeks().await?;
    top.sort_by(|a, b| b.average_2weeks.cmp(&a.average_2weeks));
    summary.ranked = top.len();

    let cleared = db.reset_trending_scores().await?;
    info!(cleared, ranked = top.len(), "re-deriving trending scores");

    let enrich_new = env_flag("TRENDING_ENRICH_NEW", false);
    let clients = enrich_new.then(EnrichmentClients::new);

    for (i, entry) in top.iter().enumerate() {
        let score = rank_score(i);
        let known = db.set_trending_score(entry.app_id, score).await?;
        if known {
            summary.games_updated += 1;
            continue;
        }
        // Ranked but not yet cataloged: optionally pull it in through the
        // standard enrichment pipeline.
        let Some(clients) = clients.as_ref() else {
            continue;
        };
        tokio::time::sleep(STORE_API_DELAY).await;
        match enrich_app(clients, entry.app_id).await {
            EnrichOutcome::Ready(game) => {
                db.upsert_game(&game).await?;
                db.set_trending_score(entry.app_id, score).await?;
                summary.games_updated += 1;
            }
            EnrichOutcome::Skipped { name, reason } => {
                info!(app_id = entry.app_id, name = %name, reason = %reason, "ranked title skipped");
            }
        }
    }

    // Keep niche-but-active titles visible with a smaller band.
    let niche = db
        .active_untrending_games(NICHE_MIN_PLAYERS, NICHE_BAND_SIZE)
        .await?;
    for (i, game_id) in niche.iter().enumerate() {
        db.set_trending_score_by_id(*game_id, niche_score(i)).await?;
        summary.games_updated += 1;
        summary.boosted += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_scores_decrease_and_floor_at_one() {
        assert_eq!(rank_score(0), 100);
        assert_eq!(rank_score(1), 99);
        assert_eq!(rank_score(99), 1);
        assert_eq!(rank_score(150), 1);
    }

    #[test]
    fn niche_band_sits_below_ranked_band() {
        assert_eq!(niche_score(0), 50);
        assert_eq!(niche_score(1), 50);
        assert_eq!(niche_score(2), 49);
        assert_eq!(niche_score(99), 1);
        assert_eq!(niche_score(200), 1);
        assert!(niche_score(0) < rank_score(50));
    }
}
