//! Explicit data-flow for the dashboard: fetch-then-rebuild, triggered by a
//! manual refresh or by the store change feed — both funnel through the same
//! path. Responses are applied last-response-wins so a slow fetch can never
//! clobber a newer one.

use anyhow::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::ownership::{build_ownership, GameWithOwnership};
use crate::store::models::{Game, Player, PlayerGame, SyncLog};
use crate::store::{listen, Db};

#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    pub players: Vec<Player>,
    pub games: Vec<Game>,
    pub player_games: Vec<PlayerGame>,
    pub latest_sync: Option<SyncLog>,
}

pub struct DashboardView {
    db: Db,
    issued: AtomicU64,
    applied: AtomicU64,
    data: RwLock<DashboardData>,
    last_error: RwLock<Option<String>>,
}

impl DashboardView {
    pub fn new(db: Db) -> Arc<Self> {
        Arc::new(Self {
            db,
            issued: AtomicU64::new(0),
            applied: AtomicU64::new(0),
            data: RwLock::new(DashboardData::default()),
            last_error: RwLock::new(None),
        })
    }

    /// Re-fetch everything and swap the snapshot in. Safe to call while
    /// another refresh is in flight: whichever response carries the highest
    /// generation wins, stale ones are dropped.
    pub async fn refresh(&self) -> Result<()> {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = tokio::try_join!(
            self.db.fetch_players(),
            self.db.fetch_all_games(),
            self.db.fetch_all_player_games(),
            self.db.latest_sync(),
        );

        match fetched {
            Ok((players, games, player_games, latest_sync)) => {
                let mut guard = self.data.write().expect("dashboard lock poisoned");
                if generation > self.applied.load(Ordering::SeqCst) {
                    *guard = DashboardData {
                        players,
                        games,
                        player_games,
                        latest_sync,
                    };
                    self.applied.store(generation, Ordering::SeqCst);
                    *self.last_error.write().expect("dashboard lock poisoned") = None;
                }
                Ok(())
            }
            Err(e) => {
                // Keep the previous snapshot visible; the UI shows the error
                // next to the last successful sync.
                *self.last_error.write().expect("dashboard lock poisoned") =
                    Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Bridge the store change feed into the refresh path. Runs until the
    /// listener drops.
    pub fn watch_changes(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let view = Arc::clone(self);
        tokio::spawn(async move {
            let mut rx = match listen::subscribe_changes(&view.db).await {
                Ok(rx) => rx,
                Err(e) => {
                    tracing::warn!(error = %e, "change feed unavailable, live updates off");
                    return;
                }
            };
            while let Some(table) = rx.recv().await {
                tracing::debug!(table, "change notification, refreshing");
                if let Err(e) = view.refresh().await {
                    tracing::warn!(error = %e, "refresh after change notification failed");
                }
            }
        })
    }

    pub fn snapshot(&self) -> DashboardData {
        self.data.read().expect("dashboard lock poisoned").clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .read()
            .expect("dashboard lock poisoned")
            .clone()
    }

    /// Enriched per-game view for the current selection, rebuilt on demand.
    pub fn enriched(&self, selected_player_ids: &[i64]) -> Vec<GameWithOwnership> {
        let data = self.data.read().expect("dashboard lock poisoned");
        build_ownership(
            &data.games,
            &data.player_games,
            &data.players,
            selected_player_ids,
        )
    }
}

/// Players selected by default: the "primary" members of the group.
pub fn default_selection(players: &[Player]) -> Vec<i64> {
    players
        .iter()
        .filter(|p| p.is_primary)
        .map(|p| p.id)
        .collect()
}

/// Announced-but-unreleased titles, soonest (or undated) last.
pub fn upcoming_games(games: &[Game]) -> Vec<&Game> {
    let mut upcoming: Vec<&Game> = games.iter().filter(|g| g.is_coming_soon).collect();
    upcoming.sort_by(|a, b| match (a.release_date, b.release_date) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    upcoming
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{game, player};
    use chrono::NaiveDate;

    #[test]
    fn default_selection_picks_primary_players() {
        let mut occasional = player(2, "bo");
        occasional.is_primary = false;
        let players = vec![player(1, "ana"), occasional, player(3, "cy")];
        assert_eq!(default_selection(&players), vec![1, 3]);
    }

    #[test]
    fn upcoming_sorted_soonest_first_undated_last() {
        let mut far = game(1, "Far");
        far.is_coming_soon = true;
        far.release_date = NaiveDate::from_ymd_opt(2026, 12, 1);
        let mut soon = game(2, "Soon");
        soon.is_coming_soon = true;
        soon.release_date = NaiveDate::from_ymd_opt(2026, 9, 1);
        let mut tba = game(3, "TBA");
        tba.is_coming_soon = true;
        let released = game(4, "Out Already");

        let games = vec![far, soon, tba, released];
        let names: Vec<&str> = upcoming_games(&games)
            .iter()
            .map(|g| g.name.as_str())
            .collect();
        assert_eq!(names, vec!["Soon", "Far", "TBA"]);
    }
}
