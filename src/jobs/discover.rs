//! Two-phase catalog discovery with an explicit continuation protocol.
//! Phase 1 fans out to the cheap listing endpoints, unions the app ids and
//! returns the not-yet-known remainder as a pending worklist. Phase 2 takes
//! that worklist back, enriches a small slice (several sequential
//! rate-limited calls per item) and returns the rest for resubmission.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, warn};

use super::enrich::{enrich_app, EnrichOutcome, EnrichmentClients};
use super::{split_batch, ItemOutcome, JobBudget, STORE_API_DELAY};
use crate::providers::steam_store::SteamStoreClient;
use crate::providers::steamspy::SteamSpyClient;
use crate::store::Db;
use crate::util::env::env_parse;

/// Items enriched per invocation; each one costs several sequential
/// rate-limited calls, so this has to stay small to fit the budget.
const DEFAULT_BATCH_SIZE: usize = 5;

const SEARCH_FILTERS: [&str; 4] = [
    "globaltopsellers",
    "topsellers",
    "popularnew",
    "popularcomingsoon",
];

/// SteamSpy two-week list entries below this average player count are noise.
const SPY_MIN_AVERAGE_2WEEKS: i64 = 3000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscoverRequest {
    #[serde(default)]
    pub pending_app_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "phase", rename_all = "lowercase")]
pub enum DiscoverResponse {
    Discovered {
        total_discovered: usize,
        already_in_db: usize,
        total_in_db: usize,
        pending_app_ids: Vec<i64>,
    },
    Processing {
        results: Vec<ItemOutcome>,
        pending_app_ids: Vec<i64>,
        remaining: usize,
        added: usize,
        skipped: usize,
    },
}

pub async fn run(db: &Db, request: DiscoverRequest) -> anyhow::Result<DiscoverResponse> {
    if request.pending_app_ids.is_empty() {
        discover_phase(db).await
    } else {
        process_phase(db, request.pending_app_ids).await
    }
}

/// Parallel fan-out across independent listing gateways. Any single source
/// failing just contributes nothing.
async fn discover_phase(db: &Db) -> anyhow::Result<DiscoverResponse> {
    let store = SteamStoreClient::new();
    let spy = SteamSpyClient::new();

    let searches = join_all(
        SEARCH_FILTERS
            .iter()
            .map(|filter| store.search_app_ids(filter, 100)),
    );
    let (searches, featured, spy_top, spy_owned) = tokio::join!(
        searches,
        store.featured_category_app_ids(),
        spy.top_two_weeks(),
        spy.top_owned_app_ids(),
    );

    let mut discovered: BTreeSet<i64> = BTreeSet::new();
    for (filter, result) in SEARCH_FILTERS.iter().zip(searches) {
        match result {
            Ok(ids) => discovered.extend(ids),
            Err(e) => warn!(filter = %filter, error = %e, "search listing unavailable"),
        }
    }
    match featured {
        Ok(ids) => discovered.extend(ids),
        Err(e) => warn!(error = %e, "featured categories unavailable"),
    }
    match spy_top {
        Ok(entries) => discovered.extend(
            entries
                .iter()
                .filter(|e| e.average_2weeks >= SPY_MIN_AVERAGE_2WEEKS)
                .map(|e| e.app_id),
        ),
        Err(e) => warn!(error = %e, "steamspy two-week list unavailable"),
    }
    match spy_owned {
        Ok(ids) => discovered.extend(ids),
        Err(e) => warn!(error = %e, "steamspy owned list unavailable"),
    }

    // Worklist read is the one fatal dependency in this phase.
    let existing = db.existing_app_ids().await?;
    let pending: Vec<i64> = discovered
        .iter()
        .copied()
        .filter(|id| !existing.contains(id))
        .collect();

    info!(
        discovered = discovered.len(),
        new = pending.len(),
        "discovery fan-out complete"
    );
    Ok(DiscoverResponse::Discovered {
        total_discovered: discovered.len(),
        already_in_db: discovered.len() - pending.len(),
        total_in_db: existing.len(),
        pending_app_ids: pending,
    })
}

/// Enrich one bounded slice of the pending worklist and hand back the rest.
async fn process_phase(db: &Db, pending: Vec<i64>) -> anyhow::Result<DiscoverResponse> {
    let batch_size: usize = env_parse("DISCOVER_BATCH_SIZE", DEFAULT_BATCH_SIZE);
    let budget = JobBudget::from_env();
    let clients = EnrichmentClients::new();

    let (batch, mut remaining) = split_batch(&pending, batch_size);
    let mut results: Vec<ItemOutcome> = Vec::with_capacity(batch.len());

    for (idx, app_id) in batch.iter().copied().enumerate() {
        if budget.exhausted() {
            // Unreached items go back on the worklist for the next call.
            let mut unreached = batch[idx..].to_vec();
            unreached.extend(remaining);
            remaining = unreached;
            warn!(unprocessed = remaining.len(), "budget exhausted mid-batch");
            break;
        }
        tokio::time::sleep(STORE_API_DELAY).await;

        match enrich_app(&clients, app_id).await {
            EnrichOutcome::Ready(game) => match db.upsert_game(&game).await {
                Ok(()) => results.push(ItemOutcome::added(app_id, game.name)),
                Err(e) => results.push(ItemOutcome::skipped(app_id, game.name, e.to_string())),
            },
            EnrichOutcome::Skipped { name, reason } => {
                results.push(ItemOutcome::skipped(app_id, name, reason))
            }
        }
    }

    let added = results
        .iter()
        .filter(|r| r.status == super::ItemStatus::Added)
        .count();
    let skipped = results.len() - added;
    Ok(DiscoverResponse::Processing {
        remaining: remaining.len(),
        pending_app_ids: remaining,
        added,
        skipped,
        results,
    })
}
