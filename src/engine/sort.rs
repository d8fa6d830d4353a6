//! The sort engine: an ordered, user-reorderable stack of sort keys
//! evaluated as a tie-breaking chain, with a per-tab implicit default key.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::filters::Tab;
use super::ownership::GameWithOwnership;
use super::score::recommendation_score;

/// Games with no price data sort after everything priced when ascending.
const MISSING_PRICE_SENTINEL_CENTS: i64 = 99_999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Recommendation,
    PriceAsc,
    PriceDesc,
    ReviewScore,
    Playtime,
    Name,
    RecentlyAdded,
    Trending,
    ReleaseDate,
    CurrentPlayers,
}

impl SortKey {
    /// The key a tab implicitly appends when the user's stack lacks it.
    pub fn default_for(tab: Tab) -> SortKey {
        match tab {
            Tab::All | Tab::Shortlisted => SortKey::Recommendation,
            Tab::Trending => SortKey::Trending,
            Tab::New => SortKey::ReleaseDate,
            Tab::Excluded => SortKey::Name,
        }
    }
}

/// How clicking an already-active key behaves. Removal is canonical;
/// promotion keeps the key and moves it to the top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleMode {
    #[default]
    Remove,
    Promote,
}

/// Toggle a key on the stack. Inactive keys append to the end. The stack
/// never empties: removing the last key resets it to `fallback`.
pub fn toggle_key(stack: &mut Vec<SortKey>, key: SortKey, mode: ToggleMode, fallback: SortKey) {
    match stack.iter().position(|k| *k == key) {
        None => stack.push(key),
        Some(pos) => match mode {
            ToggleMode::Remove => {
                stack.remove(pos);
                if stack.is_empty() {
                    stack.push(fallback);
                }
            }
            ToggleMode::Promote => {
                let key = stack.remove(pos);
                stack.insert(0, key);
            }
        },
    }
}

/// The user's stack with the tab default appended when absent, so e.g. the
/// trending tab stays trending-ordered behind the user's primary choice.
pub fn effective_stack(user_keys: &[SortKey], tab: Tab) -> Vec<SortKey> {
    let mut keys = user_keys.to_vec();
    let default = SortKey::default_for(tab);
    if !keys.contains(&default) {
        keys.push(default);
    }
    keys
}

fn price_for_sort(game: &GameWithOwnership, ascending: bool) -> i64 {
    match game.game.effective_price_cents() {
        Some(cents) => cents,
        None if ascending => MISSING_PRICE_SENTINEL_CENTS,
        None => 0,
    }
}

fn compare_by_key(
    a: &GameWithOwnership,
    b: &GameWithOwnership,
    key: SortKey,
    selected_count: usize,
) -> Ordering {
    match key {
        SortKey::Recommendation => recommendation_score(b, selected_count)
            .cmp(&recommendation_score(a, selected_count)),
        SortKey::PriceAsc => price_for_sort(a, true).cmp(&price_for_sort(b, true)),
        SortKey::PriceDesc => price_for_sort(b, false).cmp(&price_for_sort(a, false)),
        SortKey::ReviewScore => b
            .game
            .steam_review_score
            .unwrap_or(0)
            .cmp(&a.game.steam_review_score.unwrap_or(0)),
        SortKey::Playtime => b
            .total_playtime_hours()
            .total_cmp(&a.total_playtime_hours()),
        SortKey::Name => a.game.name.to_lowercase().cmp(&b.game.name.to_lowercase()),
        SortKey::RecentlyAdded => b.game.created_at.cmp(&a.game.created_at),
        SortKey::Trending => b
            .game
            .trending_score
            .unwrap_or(0)
            .cmp(&a.game.trending_score.unwrap_or(0)),
        SortKey::ReleaseDate => b.game.release_date.cmp(&a.game.release_date),
        SortKey::CurrentPlayers => b
            .game
            .current_players
            .unwrap_or(0)
            .cmp(&a.game.current_players.unwrap_or(0)),
    }
}

/// Stable sort by the key chain: first non-equal comparison wins; full ties
/// keep input order.
pub fn sort_games(games: &mut [GameWithOwnership], keys: &[SortKey], selected_count: usize) {
    games.sort_by(|a, b| {
        for key in keys {
            let ord = compare_by_key(a, b, *key, selected_count);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ownership::build_ownership;
    use crate::engine::testutil::game;
    use chrono::NaiveDate;

    fn enrich(games: Vec<crate::store::models::Game>) -> Vec<GameWithOwnership> {
        build_ownership(&games, &[], &[], &[])
    }

    #[test]
    fn toggle_appends_then_removes() {
        let mut stack = vec![SortKey::Recommendation];
        toggle_key(&mut stack, SortKey::Name, ToggleMode::Remove, SortKey::Recommendation);
        assert_eq!(stack, vec![SortKey::Recommendation, SortKey::Name]);
        toggle_key(&mut stack, SortKey::Name, ToggleMode::Remove, SortKey::Recommendation);
        assert_eq!(stack, vec![SortKey::Recommendation]);
    }

    #[test]
    fn stack_never_empties() {
        let mut stack = vec![SortKey::Trending];
        toggle_key(&mut stack, SortKey::Trending, ToggleMode::Remove, SortKey::Recommendation);
        assert_eq!(stack, vec![SortKey::Recommendation]);
    }

    #[test]
    fn promote_mode_moves_active_key_to_front() {
        let mut stack = vec![SortKey::Recommendation, SortKey::Name, SortKey::Trending];
        toggle_key(&mut stack, SortKey::Trending, ToggleMode::Promote, SortKey::Recommendation);
        assert_eq!(
            stack,
            vec![SortKey::Trending, SortKey::Recommendation, SortKey::Name]
        );
    }

    #[test]
    fn tab_default_appended_once() {
        let keys = effective_stack(&[SortKey::ReviewScore], Tab::Trending);
        assert_eq!(keys, vec![SortKey::ReviewScore, SortKey::Trending]);
        let keys = effective_stack(&[SortKey::Trending], Tab::Trending);
        assert_eq!(keys, vec![SortKey::Trending]);
    }

    #[test]
    fn missing_price_sorts_last_ascending() {
        let mut priced = game(1, "Priced");
        priced.steam_price_cents = Some(1500);
        let mut free = game(2, "Free");
        free.is_free = true;
        let unpriced = game(3, "Unpriced");

        let mut games = enrich(vec![unpriced, priced, free]);
        sort_games(&mut games, &[SortKey::PriceAsc], 0);
        let names: Vec<&str> = games.iter().map(|g| g.game.name.as_str()).collect();
        assert_eq!(names, vec!["Free", "Priced", "Unpriced"]);
    }

    #[test]
    fn chained_keys_break_ties_in_order() {
        let mut a = game(1, "Bravo");
        a.steam_review_score = Some(90);
        let mut b = game(2, "Alpha");
        b.steam_review_score = Some(90);
        let mut c = game(3, "Charlie");
        c.steam_review_score = Some(95);

        let mut games = enrich(vec![a, b, c]);
        sort_games(&mut games, &[SortKey::ReviewScore, SortKey::Name], 0);
        let names: Vec<&str> = games.iter().map(|g| g.game.name.as_str()).collect();
        assert_eq!(names, vec!["Charlie", "Alpha", "Bravo"]);
    }

    #[test]
    fn release_date_descending_missing_last() {
        let mut old = game(1, "Old");
        old.release_date = NaiveDate::from_ymd_opt(2015, 6, 1);
        let mut new = game(2, "New");
        new.release_date = NaiveDate::from_ymd_opt(2025, 6, 1);
        let undated = game(3, "Undated");

        let mut games = enrich(vec![old, undated, new]);
        sort_games(&mut games, &[SortKey::ReleaseDate], 0);
        let names: Vec<&str> = games.iter().map(|g| g.game.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Old", "Undated"]);
    }

    #[test]
    fn sort_key_serializes_to_legacy_names() {
        assert_eq!(
            serde_json::to_string(&SortKey::PriceAsc).unwrap(),
            "\"price_asc\""
        );
        assert_eq!(
            serde_json::from_str::<SortKey>("\"recently_added\"").unwrap(),
            SortKey::RecentlyAdded
        );
    }
}
