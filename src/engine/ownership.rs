//! Joins raw game rows with per-player ownership edges and the current
//! player selection, producing the enriched per-game view the filter and
//! sort layers consume.

use std::collections::{HashMap, HashSet};

use crate::store::models::{Game, Player, PlayerGame};

/// A game joined with the selected players' ownership edges. Rebuilt from
/// scratch whenever any input changes; never persisted.
#[derive(Debug, Clone)]
pub struct GameWithOwnership {
    pub game: Game,
    /// Ownership edges restricted to the selected players.
    pub owners: Vec<PlayerGame>,
    pub owner_count: usize,
    /// Raw, edge-derived: every selected player owns it. Vacuously true for
    /// an empty selection. The free-game override lives in
    /// `effectively_owned_by_all`, not here.
    pub all_selected_own: bool,
    /// Selected players with no ownership edge to this game.
    pub missing_players: Vec<Player>,
}

impl GameWithOwnership {
    /// Ownership as the filters and scorer read it: free-to-play titles
    /// count as owned by everyone.
    pub fn effectively_owned_by_all(&self) -> bool {
        self.game.is_free || self.all_selected_own
    }

    pub fn total_playtime_hours(&self) -> f64 {
        self.owners.iter().map(|o| o.playtime_hours).sum()
    }
}

/// Pure join of the four inputs. Inputs are never mutated; call again after
/// any of them changes.
pub fn build_ownership(
    games: &[Game],
    player_games: &[PlayerGame],
    players: &[Player],
    selected_player_ids: &[i64],
) -> Vec<GameWithOwnership> {
    let selected: HashSet<i64> = selected_player_ids.iter().copied().collect();
    let mut edges_by_game: HashMap<i64, Vec<&PlayerGame>> = HashMap::new();
    for pg in player_games {
        if selected.contains(&pg.player_id) {
            edges_by_game.entry(pg.game_id).or_default().push(pg);
        }
    }

    games
        .iter()
        .map(|game| {
            let owners: Vec<PlayerGame> = edges_by_game
                .get(&game.id)
                .map(|edges| edges.iter().map(|e| (*e).clone()).collect())
                .unwrap_or_default();
            let owner_ids: HashSet<i64> = owners.iter().map(|o| o.player_id).collect();
            let missing_players: Vec<Player> = players
                .iter()
                .filter(|p| selected.contains(&p.id) && !owner_ids.contains(&p.id))
                .cloned()
                .collect();

            GameWithOwnership {
                owner_count: owners.len(),
                all_selected_own: missing_players.is_empty(),
                game: game.clone(),
                owners,
                missing_players,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testutil::{edge, game, player};

    #[test]
    fn joins_only_selected_players() {
        let games = vec![game(1, "Deep Rock")];
        let players = vec![player(1, "ana"), player(2, "bo"), player(3, "cy")];
        let edges = vec![edge(1, 1, 1, 10.0), edge(2, 3, 1, 2.5)];

        let out = build_ownership(&games, &edges, &players, &[1, 2]);
        assert_eq!(out.len(), 1);
        let g = &out[0];
        assert_eq!(g.owner_count, 1);
        assert!(!g.all_selected_own);
        assert_eq!(g.missing_players.len(), 1);
        assert_eq!(g.missing_players[0].name, "bo");
        assert_eq!(g.total_playtime_hours(), 10.0);
    }

    #[test]
    fn all_selected_own_when_every_edge_present() {
        let games = vec![game(1, "Valheim")];
        let players = vec![player(1, "ana"), player(2, "bo")];
        let edges = vec![edge(1, 1, 1, 1.0), edge(2, 2, 1, 0.0)];

        let out = build_ownership(&games, &edges, &players, &[1, 2]);
        assert!(out[0].all_selected_own);
        assert!(out[0].missing_players.is_empty());
    }

    #[test]
    fn empty_selection_is_vacuously_owned_by_all() {
        let games = vec![game(1, "Core Keeper")];
        let players = vec![player(1, "ana")];

        let out = build_ownership(&games, &[], &players, &[]);
        assert_eq!(out[0].owner_count, 0);
        assert!(out[0].all_selected_own);
    }

    #[test]
    fn free_game_is_effectively_owned_regardless_of_edges() {
        let mut g = game(1, "Warframe");
        g.is_free = true;
        let players = vec![player(1, "ana"), player(2, "bo")];

        let out = build_ownership(&[g], &[], &players, &[1, 2]);
        assert!(!out[0].all_selected_own);
        assert!(out[0].effectively_owned_by_all());
    }
}
