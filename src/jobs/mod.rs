//! Ingestion jobs: idempotent, time-boxed batch operations triggered over
//! HTTP or from the CLI. Per-item gateway failures degrade to "no data" and
//! never abort a batch; only worklist reads and sync-log writes are fatal.

pub mod discover;
pub mod enrich;
pub mod libraries;
pub mod player_counts;
pub mod prices;
pub mod trending;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::util::env::env_parse;

/// Fixed inter-call delay against the storefront's per-IP rate limits.
pub const STORE_API_DELAY: Duration = Duration::from_millis(200);

/// Wall-clock budget for one invocation. Continuation-style jobs stop
/// enriching when the budget runs out and hand the rest back to the caller.
#[derive(Debug, Clone, Copy)]
pub struct JobBudget {
    deadline: Instant,
}

impl JobBudget {
    pub fn from_env() -> Self {
        Self::with_secs(env_parse("JOB_BUDGET_SECS", 10u64))
    }

    pub fn with_secs(secs: u64) -> Self {
        Self {
            deadline: Instant::now() + Duration::from_secs(secs),
        }
    }

    pub fn exhausted(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Added,
    Skipped,
}

/// Per-item outcome record returned to the caller, so an operator can tell
/// "not a game" apart from "API down".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemOutcome {
    pub app_id: i64,
    pub name: String,
    pub status: ItemStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ItemOutcome {
    pub fn added(app_id: i64, name: impl Into<String>) -> Self {
        Self {
            app_id,
            name: name.into(),
            status: ItemStatus::Added,
            reason: None,
        }
    }

    pub fn skipped(app_id: i64, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            app_id,
            name: name.into(),
            status: ItemStatus::Skipped,
            reason: Some(reason.into()),
        }
    }
}

/// Split a pending worklist into the slice for this invocation and the
/// remainder for the next one.
pub fn split_batch<T: Clone>(pending: &[T], batch_size: usize) -> (Vec<T>, Vec<T>) {
    let cut = batch_size.min(pending.len());
    (pending[..cut].to_vec(), pending[cut..].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_batch_covers_short_lists() {
        let (batch, rest) = split_batch(&[1, 2, 3], 5);
        assert_eq!(batch, vec![1, 2, 3]);
        assert!(rest.is_empty());
    }

    // Re-feeding the remainder eventually drains the worklist: the
    // continuation protocol closes.
    #[test]
    fn repeated_splitting_terminates() {
        let mut pending: Vec<i64> = (0..23).collect();
        let mut processed = 0;
        let mut rounds = 0;
        while !pending.is_empty() {
            let (batch, rest) = split_batch(&pending, 5);
            processed += batch.len();
            pending = rest;
            rounds += 1;
            assert!(rounds <= 23, "continuation failed to make progress");
        }
        assert_eq!(processed, 23);
        assert_eq!(rounds, 5);
    }

    #[test]
    fn exhausted_budget_reports_exhausted() {
        let budget = JobBudget::with_secs(0);
        assert!(budget.exhausted());
        let budget = JobBudget::with_secs(3600);
        assert!(!budget.exhausted());
    }
}
