//! Price sync against the deal aggregator. Two-phase: resolve each
//! worklist item's id in ITAD's namespace in parallel, then one batched
//! overview call, writing back the best price/store/link per game. The
//! worklist rotates oldest-updated-first so every eligible game is
//! eventually revisited.

use futures::future::join_all;
use serde::Serialize;
use tracing::{info, warn};

use crate::providers::itad::ItadClient;
use crate::store::queries::WorkItem;
use crate::store::Db;
use crate::util::env::{env_opt, env_parse};

const DEFAULT_BATCH_SIZE: i64 = 20;

#[derive(Debug, Clone, Serialize)]
pub struct PriceSyncSummary {
    pub success: bool,
    /// True when the job bowed out for lack of an API key.
    pub skipped: bool,
    pub games_updated: i32,
    pub batch: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub async fn run(db: &Db) -> PriceSyncSummary {
    let mut summary = PriceSyncSummary {
        success: false,
        skipped: false,
        games_updated: 0,
        batch: 0,
        error: None,
    };

    let itad = ItadClient::from_env();
    if !itad.has_api_key() {
        info!("no ITAD_API_KEY configured, price sync skipped");
        summary.success = true;
        summary.skipped = true;
        return summary;
    }

    let log_id = match db.open_sync_log("prices").await {
        Ok(id) => id,
        Err(e) => {
            summary.error = Some(e.to_string());
            return summary;
        }
    };

    let (status, error) = match run_inner(db, &itad, &mut summary).await {
        Ok(()) => ("success", None),
        Err(e) => {
            warn!(error = %e, "price sync failed");
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

async fn run_inner(
    db: &Db,
    itad: &ItadClient,
    summary: &mut PriceSyncSummary,
) -> anyhow::Result<()> {
    let batch_size: i64 = env_parse("PRICE_BATCH_SIZE", DEFAULT_BATCH_SIZE);
    let worklist = db.price_sync_worklist(batch_size).await?;
    summary.batch = worklist.len();
    if worklist.is_empty() {
        return Ok(());
    }

    // Phase 1: id resolution, in parallel — these are independent lookups.
    let lookups = join_all(worklist.iter().map(|item| itad.lookup_app(item.steam_app_id))).await;
    let resolved: Vec<(&WorkItem, String)> = worklist
        .iter()
        .zip(lookups)
        .filter_map(|(item, lookup)| match lookup {
            Ok(Some(itad_id)) => Some((item, itad_id)),
            Ok(None) => None,
            Err(e) => {
                warn!(app_id = item.steam_app_id, error = %e, "ITAD lookup failed");
                None
            }
        })
        .collect();
    if resolved.is_empty() {
        return Ok(());
    }

    // Phase 2: one batched overview call for everything that resolved.
    let country = env_opt("ITAD_COUNTRY").unwrap_or_else(|| "GB".into());
    let ids: Vec<String> = resolved.iter().map(|(_, id)| id.clone()).collect();
    let deals = match itad.price_overview(&ids, &country).await {
        Ok(deals) => deals,
        Err(e) => {
            // Overview unavailable: the rotation still advanced via
            // last_updated_at on the next writes, so treat as a dry run.
            warn!(error = %e, "ITAD overview unavailable");
            return Ok(());
        }
    };

    for deal in deals {
        let Some((item, _)) = resolved.iter().find(|(_, id)| *id == deal.itad_id) else {
            continue;
        };
        db.set_best_price(
            item.id,
            deal.price_cents,
            deal.shop_name.as_deref(),
            deal.url.as_deref(),
        )
        .await?;
        summary.games_updated += 1;
    }

    Ok(())
}
