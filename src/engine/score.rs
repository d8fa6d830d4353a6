//! Recommendation scoring and catalog-derived inference helpers. The score
//! is additive across independent weighted factors and is a relative ranking
//! signal, not a calibrated percentage.

use super::ownership::GameWithOwnership;
use crate::store::models::ProtonTier;

/// Desirability score for one enriched game given how many players are
/// selected. Factors (clamped to their own sub-ranges):
/// ownership overlap 40, review positivity 25, price 15, trending 10,
/// on-sale 5, native-Linux 5.
pub fn recommendation_score(game: &GameWithOwnership, selected_count: usize) -> i32 {
    let g = &game.game;
    let mut score = 0.0f64;

    if selected_count > 0 {
        score += (game.owner_count as f64 / selected_count as f64) * 40.0;
    }

    if let Some(review) = g.steam_review_score {
        score += (review as f64 / 100.0) * 25.0;
    }

    if g.is_free {
        score += 15.0;
    } else if let Some(cents) = g.best_price_cents.or(g.steam_price_cents) {
        score += (15.0 - cents as f64 / 100.0).max(0.0);
    }

    if let Some(trending) = g.trending_score {
        score += (trending as f64 / 10.0).min(10.0);
    }

    if g.is_on_sale {
        score += 5.0;
    }

    if g.proton_tier() == ProtonTier::Native {
        score += 5.0;
    }

    score.round() as i32
}

/// Top `limit` candidates by score, restricted to titles with enough reviews
/// to trust the signal.
pub fn quick_picks<'a>(
    games: &'a [GameWithOwnership],
    selected_count: usize,
    min_review_count: i32,
    limit: usize,
) -> Vec<&'a GameWithOwnership> {
    let mut picks: Vec<&GameWithOwnership> = games
        .iter()
        .filter(|g| g.game.steam_review_count.unwrap_or(0) >= min_review_count)
        .collect();
    picks.sort_by_key(|g| std::cmp::Reverse(recommendation_score(g, selected_count)));
    picks.truncate(limit);
    picks
}

/// Qualitative review label by fixed positivity thresholds.
pub fn review_label(score: i32) -> &'static str {
    if score >= 95 {
        "Overwhelmingly Positive"
    } else if score >= 80 {
        "Very Positive"
    } else if score >= 70 {
        "Mostly Positive"
    } else if score >= 40 {
        "Mixed"
    } else if score >= 20 {
        "Mostly Negative"
    } else {
        "Overwhelmingly Negative"
    }
}

const COMPETITIVE_MP: [&str; 2] = ["Multi-player", "Online Multi-Player"];
const COOP: [&str; 2] = ["Co-op", "Online Co-op"];
const LOCAL: [&str; 3] = [
    "Shared/Split Screen",
    "Shared/Split Screen Co-op",
    "Shared/Split Screen PvP",
];

/// Infer a max player count from capability categories and store tags.
/// 999 is the "uncapped/MMO" sentinel (displayed as "MMO"); None means
/// unknown, which is distinct from zero.
pub fn infer_max_players(categories: &[String], tags: &[String]) -> Option<i32> {
    let all_labels: Vec<String> = categories
        .iter()
        .chain(tags.iter())
        .map(|s| s.to_lowercase())
        .collect();
    if all_labels
        .iter()
        .any(|t| t.contains("massively multiplayer") || t.contains("mmo"))
    {
        return Some(999);
    }
    if all_labels.iter().any(|t| t.contains("battle royale")) {
        return Some(100);
    }

    let has = |names: &[&str]| categories.iter().any(|c| names.contains(&c.as_str()));
    let has_mp = has(&COMPETITIVE_MP);
    let has_coop = has(&COOP);
    let has_sp = categories.iter().any(|c| c == "Single-player");
    let has_local = has(&LOCAL);

    if has_sp && !has_mp && !has_coop && !has_local {
        return Some(1);
    }
    if has_local && !has_mp && !has_coop {
        return Some(4);
    }
    if has_coop && !has_mp {
        return Some(4);
    }
    if has_mp && has_coop {
        return Some(8);
    }
    if has_mp {
        return Some(16);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ownership::build_ownership;
    use crate::engine::testutil::{edge, game, player};

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn max_component_score_is_100() {
        let mut g = game(1, "Perfect Game");
        g.is_free = true;
        g.is_on_sale = true;
        g.protondb_rating = Some("native".into());
        g.steam_review_score = Some(100);
        g.trending_score = Some(100);
        let players = vec![player(1, "ana"), player(2, "bo")];
        let edges = vec![edge(1, 1, 1, 1.0), edge(2, 2, 1, 1.0)];
        let enriched = build_ownership(&[g], &edges, &players, &[1, 2]);

        assert_eq!(recommendation_score(&enriched[0], 2), 100);
    }

    #[test]
    fn score_is_non_negative_for_bare_game() {
        let g = game(1, "Nothing Known");
        let enriched = build_ownership(&[g], &[], &[], &[]);
        assert_eq!(recommendation_score(&enriched[0], 0), 0);
    }

    // Two players selected, one owns; free, native, 90% positive, no
    // trending, not on sale: 20 + 22.5 + 15 + 5 = 62.5 -> 63.
    #[test]
    fn partial_ownership_scenario() {
        let mut g = game(1, "Game X");
        g.is_free = true;
        g.protondb_rating = Some("native".into());
        g.steam_review_score = Some(90);
        let players = vec![player(1, "ana"), player(2, "bo")];
        let edges = vec![edge(1, 1, 1, 3.0)];
        let enriched = build_ownership(&[g], &edges, &players, &[1, 2]);

        assert_eq!(enriched[0].owner_count, 1);
        assert!(!enriched[0].all_selected_own);
        assert_eq!(recommendation_score(&enriched[0], 2), 63);
        // With nobody selected the ownership factor drops out: 42.5 -> 43.
        let enriched = build_ownership(
            &[enriched[0].game.clone()],
            &[],
            &players,
            &[],
        );
        assert_eq!(recommendation_score(&enriched[0], 0), 43);
    }

    #[test]
    fn expensive_game_price_factor_floors_at_zero() {
        let mut g = game(1, "Premium");
        g.steam_price_cents = Some(5999);
        let enriched = build_ownership(&[g], &[], &[], &[]);
        assert_eq!(recommendation_score(&enriched[0], 0), 0);
    }

    #[test]
    fn best_price_preferred_over_list_price() {
        let mut g = game(1, "Discounted");
        g.steam_price_cents = Some(2000);
        g.best_price_cents = Some(500);
        let enriched = build_ownership(&[g], &[], &[], &[]);
        // 15 - 5 = 10
        assert_eq!(recommendation_score(&enriched[0], 0), 10);
    }

    #[test]
    fn review_label_boundaries() {
        assert_eq!(review_label(95), "Overwhelmingly Positive");
        assert_eq!(review_label(80), "Very Positive");
        assert_eq!(review_label(79), "Mostly Positive");
        assert_eq!(review_label(70), "Mostly Positive");
        assert_eq!(review_label(40), "Mixed");
        assert_eq!(review_label(39), "Mostly Negative");
        assert_eq!(review_label(20), "Mostly Negative");
        assert_eq!(review_label(19), "Overwhelmingly Negative");
    }

    #[test]
    fn infer_fixed_points() {
        assert_eq!(infer_max_players(&strs(&["Single-player"]), &[]), Some(1));
        assert_eq!(
            infer_max_players(&strs(&["Co-op", "Online Co-op"]), &[]),
            Some(4)
        );
        assert_eq!(
            infer_max_players(&[], &strs(&["Massively Multiplayer"])),
            Some(999)
        );
        assert_eq!(infer_max_players(&strs(&["Multi-player"]), &[]), Some(16));
        assert_eq!(
            infer_max_players(&strs(&["Multi-player", "Co-op"]), &[]),
            Some(8)
        );
        assert_eq!(
            infer_max_players(&strs(&["Shared/Split Screen"]), &[]),
            Some(4)
        );
        assert_eq!(infer_max_players(&[], &strs(&["Battle Royale"])), Some(100));
        assert_eq!(infer_max_players(&[], &[]), None);
    }

    #[test]
    fn infer_is_deterministic() {
        let cats = strs(&["Single-player", "Co-op"]);
        let first = infer_max_players(&cats, &[]);
        for _ in 0..10 {
            assert_eq!(infer_max_players(&cats, &[]), first);
        }
    }

    #[test]
    fn quick_picks_respects_review_floor() {
        let mut a = game(1, "Trusted");
        a.steam_review_count = Some(500);
        a.steam_review_score = Some(90);
        let mut b = game(2, "Obscure");
        b.steam_review_count = Some(3);
        b.steam_review_score = Some(100);
        let enriched = build_ownership(&[a, b], &[], &[], &[]);

        let picks = quick_picks(&enriched, 0, 150, 5);
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].game.name, "Trusted");
    }
}
