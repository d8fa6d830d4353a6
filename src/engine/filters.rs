//! The layered filter pipeline: hard rules, tab semantics, user toggles,
//! tag include/exclude sets and free-text search, evaluated as a pure
//! AND-chain per game. Also produces the tag facet for the filter chips.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::config::TabConfig;
use super::ownership::GameWithOwnership;
use super::sort::SortKey;
use crate::store::models::ProtonTier;

const TAG_FACET_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    All,
    Trending,
    New,
    Shortlisted,
    Excluded,
}

impl Tab {
    pub const ALL: [Tab; 5] = [
        Tab::All,
        Tab::Trending,
        Tab::New,
        Tab::Shortlisted,
        Tab::Excluded,
    ];
}

/// Capability toggles, OR'd together. With nothing enabled the predicate
/// passes everything (fail-open).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameModeMask {
    #[serde(default)]
    pub multiplayer: bool,
    #[serde(default)]
    pub coop: bool,
    #[serde(default)]
    pub single_player: bool,
    #[serde(default)]
    pub local_multiplayer: bool,
}

const MODE_MULTIPLAYER: [&str; 2] = ["Multi-player", "Online Multi-Player"];
const MODE_COOP: [&str; 4] = [
    "Co-op",
    "Online Co-op",
    "LAN Co-op",
    "Shared/Split Screen Co-op",
];
const MODE_LOCAL: [&str; 3] = [
    "Shared/Split Screen",
    "Shared/Split Screen Co-op",
    "Shared/Split Screen PvP",
];

impl GameModeMask {
    pub fn any_enabled(&self) -> bool {
        self.multiplayer || self.coop || self.single_player || self.local_multiplayer
    }

    fn matches(&self, categories: &[String]) -> bool {
        let has = |names: &[&str]| categories.iter().any(|c| names.contains(&c.as_str()));
        (self.multiplayer && has(&MODE_MULTIPLAYER))
            || (self.coop && has(&MODE_COOP))
            || (self.single_player && categories.iter().any(|c| c == "Single-player"))
            || (self.local_multiplayer && has(&MODE_LOCAL))
    }
}

/// Compatibility-tier floor. "Native" means exactly native; the other rungs
/// are at-or-above thresholds on the tier ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtonFloor {
    #[default]
    All,
    Native,
    Platinum,
    Gold,
}

impl ProtonFloor {
    fn passes(self, tier: ProtonTier) -> bool {
        match self {
            ProtonFloor::All => true,
            ProtonFloor::Native => tier == ProtonTier::Native,
            ProtonFloor::Platinum => tier >= ProtonTier::Platinum,
            ProtonFloor::Gold => tier >= ProtonTier::Gold,
        }
    }
}

/// Release-recency ceiling. Anything but `All` requires a known release
/// date inside the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReleaseWindow {
    #[serde(rename = "week")]
    Week,
    #[serde(rename = "month")]
    Month,
    #[serde(rename = "3months")]
    ThreeMonths,
    #[serde(rename = "6months")]
    SixMonths,
    #[serde(rename = "year")]
    Year,
    #[serde(rename = "2years")]
    TwoYears,
    #[serde(rename = "3years")]
    ThreeYears,
    #[serde(rename = "5years")]
    FiveYears,
    #[serde(rename = "10years")]
    TenYears,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl ReleaseWindow {
    fn days(self) -> Option<i64> {
        match self {
            ReleaseWindow::Week => Some(7),
            ReleaseWindow::Month => Some(30),
            ReleaseWindow::ThreeMonths => Some(90),
            ReleaseWindow::SixMonths => Some(180),
            ReleaseWindow::Year => Some(365),
            ReleaseWindow::TwoYears => Some(730),
            ReleaseWindow::ThreeYears => Some(1095),
            ReleaseWindow::FiveYears => Some(1825),
            ReleaseWindow::TenYears => Some(3650),
            ReleaseWindow::All => None,
        }
    }
}

/// Per-session filter state. Tags obey mutual exclusion between the include
/// and exclude sets; the sort stack is kept non-empty by the toggle ops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterState {
    pub selected_players: Vec<i64>,
    pub owned_by_all: bool,
    pub free_only: bool,
    pub on_sale_only: bool,
    pub shortlisted_only: bool,
    pub linux_only: bool,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    pub sort_keys: Vec<SortKey>,
    pub search_query: String,
    pub game_modes: GameModeMask,
    pub proton_floor: ProtonFloor,
    pub release_window: ReleaseWindow,
}

impl FilterState {
    /// Fresh state seeded from a tab's resolved defaults.
    pub fn for_tab(tab: Tab, config: &TabConfig) -> Self {
        Self {
            selected_players: Vec::new(),
            owned_by_all: false,
            free_only: false,
            on_sale_only: false,
            shortlisted_only: false,
            linux_only: config.linux_only,
            include_tags: Vec::new(),
            exclude_tags: config.exclude_tags.clone(),
            sort_keys: if config.sort_keys.is_empty() {
                vec![SortKey::default_for(tab)]
            } else {
                config.sort_keys.clone()
            },
            search_query: String::new(),
            game_modes: config.game_modes,
            proton_floor: config.proton_floor,
            release_window: config.release_window,
        }
    }

    /// Include a tag (or drop it if already included). Membership in the
    /// exclude set is surrendered first; a tag is never in both.
    pub fn toggle_include_tag(&mut self, tag: &str) {
        remove_tag(&mut self.exclude_tags, tag);
        if !remove_tag(&mut self.include_tags, tag) {
            self.include_tags.push(tag.to_string());
        }
    }

    pub fn toggle_exclude_tag(&mut self, tag: &str) {
        remove_tag(&mut self.include_tags, tag);
        if !remove_tag(&mut self.exclude_tags, tag) {
            self.exclude_tags.push(tag.to_string());
        }
    }
}

fn remove_tag(tags: &mut Vec<String>, tag: &str) -> bool {
    let before = tags.len();
    tags.retain(|t| !t.eq_ignore_ascii_case(tag));
    tags.len() != before
}

/// Everything the predicate chain needs besides the filter toggles.
#[derive(Debug, Clone)]
pub struct FilterContext<'a> {
    pub tab: Tab,
    pub shortlisted: &'a HashSet<i64>,
    pub excluded: &'a HashSet<i64>,
    pub now: DateTime<Utc>,
}

pub struct FilterOutcome {
    /// Games passing the full chain, in input order (unsorted).
    pub games: Vec<GameWithOwnership>,
    /// Top tags by frequency among games passing everything except the tag
    /// sets and search, so the chips reflect the current context.
    pub available_tags: Vec<String>,
}

/// Steps 1-10: hard rules, tab semantics and user toggles.
fn passes_base(g: &GameWithOwnership, f: &FilterState, ctx: &FilterContext) -> bool {
    // 1. Operator kill-switch wins everywhere.
    if g.game.servers_deprecated {
        return false;
    }
    // 2.
    if f.linux_only && !g.game.supports_linux {
        return false;
    }
    // 3. The excluded tab shows only excluded games; every other tab hides them.
    let is_excluded = ctx.excluded.contains(&g.game.id);
    if ctx.tab == Tab::Excluded {
        if !is_excluded {
            return false;
        }
    } else if is_excluded {
        return false;
    }
    // 4. The whole group has to fit.
    if !f.selected_players.is_empty() {
        if let Some(max) = g.game.max_players {
            if (max as usize) < f.selected_players.len() {
                return false;
            }
        }
    }
    // 5.
    if f.game_modes.any_enabled() && !f.game_modes.matches(&g.game.categories) {
        return false;
    }
    // 6.
    if !f.proton_floor.passes(g.game.proton_tier()) {
        return false;
    }
    // 7.
    if let Some(days) = f.release_window.days() {
        match g.game.release_date {
            Some(date) => {
                if (ctx.now.date_naive() - date).num_days() > days {
                    return false;
                }
            }
            None => return false,
        }
    }
    // 8.
    if ctx.tab == Tab::Trending && g.game.trending_score.unwrap_or(0) <= 0 {
        return false;
    }
    // 9.
    if (f.shortlisted_only || ctx.tab == Tab::Shortlisted)
        && !ctx.shortlisted.contains(&g.game.id)
    {
        return false;
    }
    // 10. Free games count as owned and as on-sale.
    if f.owned_by_all && !g.effectively_owned_by_all() {
        return false;
    }
    if f.free_only && !g.game.is_free {
        return false;
    }
    if f.on_sale_only && !g.game.is_on_sale && !g.game.is_free {
        return false;
    }
    true
}

/// Steps 11-13: tag sets and search.
fn passes_tags_and_search(g: &GameWithOwnership, f: &FilterState) -> bool {
    if !f.include_tags.is_empty() || !f.exclude_tags.is_empty() {
        let labels: Vec<String> = g
            .game
            .steam_tags
            .iter()
            .chain(g.game.categories.iter())
            .map(|t| t.to_lowercase())
            .collect();
        if !f.include_tags.is_empty()
            && !f
                .include_tags
                .iter()
                .any(|t| labels.contains(&t.to_lowercase()))
        {
            return false;
        }
        if f
            .exclude_tags
            .iter()
            .any(|t| labels.contains(&t.to_lowercase()))
        {
            return false;
        }
    }
    if !f.search_query.is_empty()
        && !g
            .game
            .name
            .to_lowercase()
            .contains(&f.search_query.to_lowercase())
    {
        return false;
    }
    true
}

/// Run the full chain and derive the tag facet from the pre-tag set.
pub fn apply_filters(
    games: &[GameWithOwnership],
    filters: &FilterState,
    ctx: &FilterContext,
) -> FilterOutcome {
    let base: Vec<&GameWithOwnership> = games
        .iter()
        .filter(|g| passes_base(g, filters, ctx))
        .collect();

    let mut tag_counts: HashMap<&str, usize> = HashMap::new();
    for g in &base {
        for tag in &g.game.steam_tags {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
    }
    let mut ranked: Vec<(&str, usize)> = tag_counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    let available_tags = ranked
        .into_iter()
        .take(TAG_FACET_SIZE)
        .map(|(tag, _)| tag.to_string())
        .collect();

    let visible = base
        .into_iter()
        .filter(|g| passes_tags_and_search(g, filters))
        .cloned()
        .collect();

    FilterOutcome {
        games: visible,
        available_tags,
    }
}

/// Visible-game count per tab, for the tab badges.
pub fn tab_counts(
    games: &[GameWithOwnership],
    filters: &FilterState,
    shortlisted: &HashSet<i64>,
    excluded: &HashSet<i64>,
    now: DateTime<Utc>,
) -> BTreeMap<Tab, usize> {
    Tab::ALL
        .iter()
        .map(|tab| {
            let ctx = FilterContext {
                tab: *tab,
                shortlisted,
                excluded,
                now,
            };
            let count = games
                .iter()
                .filter(|g| passes_base(g, filters, &ctx) && passes_tags_and_search(g, filters))
                .count();
            (*tab, count)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ownership::build_ownership;
    use crate::engine::testutil::{edge, game, player};
    use chrono::{Duration, TimeZone};

    fn base_state() -> FilterState {
        FilterState {
            selected_players: Vec::new(),
            owned_by_all: false,
            free_only: false,
            on_sale_only: false,
            shortlisted_only: false,
            linux_only: false,
            include_tags: Vec::new(),
            exclude_tags: Vec::new(),
            sort_keys: vec![SortKey::Recommendation],
            search_query: String::new(),
            game_modes: GameModeMask::default(),
            proton_floor: ProtonFloor::All,
            release_window: ReleaseWindow::All,
        }
    }

    fn ctx<'a>(
        tab: Tab,
        shortlisted: &'a HashSet<i64>,
        excluded: &'a HashSet<i64>,
    ) -> FilterContext<'a> {
        FilterContext {
            tab,
            shortlisted,
            excluded,
            now: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    fn run(
        games: &[GameWithOwnership],
        f: &FilterState,
        tab: Tab,
        shortlisted: &HashSet<i64>,
        excluded: &HashSet<i64>,
    ) -> Vec<String> {
        apply_filters(games, f, &ctx(tab, shortlisted, excluded))
            .games
            .iter()
            .map(|g| g.game.name.clone())
            .collect()
    }

    #[test]
    fn deprecated_servers_hidden_everywhere() {
        let mut dead = game(1, "Dead Game");
        dead.servers_deprecated = true;
        let games = build_ownership(&[dead, game(2, "Alive")], &[], &[], &[]);
        let none = HashSet::new();
        for tab in Tab::ALL {
            let visible = run(&games, &base_state(), tab, &none, &none);
            assert!(!visible.contains(&"Dead Game".to_string()), "tab {tab:?}");
        }
    }

    #[test]
    fn excluded_tab_inverts_exclusion_register() {
        let games = build_ownership(&[game(1, "Kept"), game(2, "Banished")], &[], &[], &[]);
        let none = HashSet::new();
        let excluded: HashSet<i64> = [2].into();

        let visible = run(&games, &base_state(), Tab::All, &none, &excluded);
        assert_eq!(visible, vec!["Kept"]);
        let visible = run(&games, &base_state(), Tab::Excluded, &none, &excluded);
        assert_eq!(visible, vec!["Banished"]);
    }

    #[test]
    fn group_size_hides_too_small_games() {
        let mut duo = game(1, "Duo Only");
        duo.max_players = Some(2);
        let mut mmo = game(2, "Big World");
        mmo.max_players = Some(999);
        let unknown = game(3, "Unknown Cap");
        let players: Vec<_> = (1..=3).map(|i| player(i, &format!("p{i}"))).collect();
        let games = build_ownership(&[duo, mmo, unknown], &[], &players, &[1, 2, 3]);

        let mut f = base_state();
        f.selected_players = vec![1, 2, 3];
        let none = HashSet::new();
        let visible = run(&games, &f, Tab::All, &none, &none);
        assert_eq!(visible, vec!["Big World", "Unknown Cap"]);
    }

    #[test]
    fn mode_mask_is_fail_open() {
        let mut solo = game(1, "Solo");
        solo.categories = vec!["Single-player".into()];
        let mut coop = game(2, "Co-op Game");
        coop.categories = vec!["Online Co-op".into()];
        let games = build_ownership(&[solo, coop], &[], &[], &[]);
        let none = HashSet::new();

        let visible = run(&games, &base_state(), Tab::All, &none, &none);
        assert_eq!(visible.len(), 2);

        let mut f = base_state();
        f.game_modes.coop = true;
        let visible = run(&games, &f, Tab::All, &none, &none);
        assert_eq!(visible, vec!["Co-op Game"]);
    }

    #[test]
    fn proton_floor_native_is_exact() {
        let mut native = game(1, "Native");
        native.protondb_rating = Some("native".into());
        let mut platinum = game(2, "Platinum");
        platinum.protondb_rating = Some("platinum".into());
        let mut gold = game(3, "Gold");
        gold.protondb_rating = Some("gold".into());
        let games = build_ownership(&[native, platinum, gold], &[], &[], &[]);
        let none = HashSet::new();

        let mut f = base_state();
        f.proton_floor = ProtonFloor::Native;
        assert_eq!(run(&games, &f, Tab::All, &none, &none), vec!["Native"]);
        f.proton_floor = ProtonFloor::Platinum;
        assert_eq!(
            run(&games, &f, Tab::All, &none, &none),
            vec!["Native", "Platinum"]
        );
        f.proton_floor = ProtonFloor::Gold;
        assert_eq!(
            run(&games, &f, Tab::All, &none, &none),
            vec!["Native", "Platinum", "Gold"]
        );
    }

    #[test]
    fn release_window_fails_missing_dates() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut recent = game(1, "Recent");
        recent.release_date = Some((now - Duration::days(20)).date_naive());
        let mut old = game(2, "Old");
        old.release_date = Some((now - Duration::days(400)).date_naive());
        let undated = game(3, "Undated");
        let games = build_ownership(&[recent, old, undated], &[], &[], &[]);
        let none = HashSet::new();

        let mut f = base_state();
        f.release_window = ReleaseWindow::Month;
        assert_eq!(run(&games, &f, Tab::All, &none, &none), vec!["Recent"]);
        f.release_window = ReleaseWindow::All;
        assert_eq!(run(&games, &f, Tab::All, &none, &none).len(), 3);
    }

    #[test]
    fn trending_tab_needs_positive_score() {
        let mut hot = game(1, "Hot");
        hot.trending_score = Some(80);
        let cold = game(2, "Cold");
        let games = build_ownership(&[hot, cold], &[], &[], &[]);
        let none = HashSet::new();

        assert_eq!(
            run(&games, &base_state(), Tab::Trending, &none, &none),
            vec!["Hot"]
        );
    }

    #[test]
    fn owned_by_all_uses_effective_ownership() {
        let mut owned = game(1, "Owned");
        owned.is_free = false;
        let mut free = game(2, "Free Rider");
        free.is_free = true;
        let unowned = game(3, "Unowned");
        let players = vec![player(1, "ana"), player(2, "bo")];
        let edges = vec![edge(1, 1, 1, 1.0), edge(2, 2, 1, 1.0), edge(3, 1, 3, 1.0)];
        let games = build_ownership(&[owned, free, unowned], &edges, &players, &[1, 2]);
        let none = HashSet::new();

        let mut f = base_state();
        f.owned_by_all = true;
        let visible = run(&games, &f, Tab::All, &none, &none);
        assert_eq!(visible, vec!["Owned", "Free Rider"]);
    }

    #[test]
    fn tag_sets_filter_case_insensitively() {
        let mut rogue = game(1, "Rogue");
        rogue.steam_tags = vec!["Roguelike".into()];
        let mut craft = game(2, "Craft");
        craft.steam_tags = vec!["Survival".into()];
        craft.categories = vec!["Co-op".into()];
        let games = build_ownership(&[rogue, craft], &[], &[], &[]);
        let none = HashSet::new();

        let mut f = base_state();
        f.include_tags = vec!["roguelike".into()];
        assert_eq!(run(&games, &f, Tab::All, &none, &none), vec!["Rogue"]);

        let mut f = base_state();
        f.exclude_tags = vec!["SURVIVAL".into()];
        assert_eq!(run(&games, &f, Tab::All, &none, &none), vec!["Rogue"]);

        // Categories count as labels too.
        let mut f = base_state();
        f.include_tags = vec!["co-op".into()];
        assert_eq!(run(&games, &f, Tab::All, &none, &none), vec!["Craft"]);
    }

    #[test]
    fn search_matches_name_substring() {
        let games = build_ownership(
            &[game(1, "Deep Rock Galactic"), game(2, "Valheim")],
            &[],
            &[],
            &[],
        );
        let none = HashSet::new();
        let mut f = base_state();
        f.search_query = "rock".into();
        assert_eq!(
            run(&games, &f, Tab::All, &none, &none),
            vec!["Deep Rock Galactic"]
        );
    }

    #[test]
    fn facet_ignores_tag_filters_but_respects_base() {
        let mut a = game(1, "A");
        a.steam_tags = vec!["Survival".into(), "Co-op".into()];
        let mut b = game(2, "B");
        b.steam_tags = vec!["Survival".into()];
        let mut hidden = game(3, "Hidden");
        hidden.servers_deprecated = true;
        hidden.steam_tags = vec!["Horror".into()];
        let games = build_ownership(&[a, b, hidden], &[], &[], &[]);
        let none = HashSet::new();

        let mut f = base_state();
        f.include_tags = vec!["Co-op".into()];
        let outcome = apply_filters(&games, &f, &ctx(Tab::All, &none, &none));
        // Facet is computed pre-tag-filter: both survivors contribute.
        assert_eq!(outcome.available_tags[0], "Survival");
        assert!(!outcome.available_tags.contains(&"Horror".to_string()));
        // But the visible set honours the include tag.
        assert_eq!(outcome.games.len(), 1);
        assert_eq!(outcome.games[0].game.name, "A");
    }

    #[test]
    fn tag_toggles_are_mutually_exclusive() {
        let mut f = base_state();
        f.toggle_include_tag("Survival");
        assert!(f.include_tags.contains(&"Survival".to_string()));
        f.toggle_exclude_tag("survival");
        assert!(f.include_tags.is_empty());
        assert!(f.exclude_tags.contains(&"survival".to_string()));
        f.toggle_include_tag("SURVIVAL");
        assert!(f.exclude_tags.is_empty());
        assert_eq!(f.include_tags, vec!["SURVIVAL".to_string()]);
        f.toggle_include_tag("survival");
        assert!(f.include_tags.is_empty());
        assert!(f.exclude_tags.is_empty());
    }

    #[test]
    fn filters_only_narrow() {
        let mut a = game(1, "A");
        a.is_free = true;
        a.steam_tags = vec!["Survival".into()];
        let mut b = game(2, "B");
        b.steam_tags = vec!["Horror".into()];
        let games = build_ownership(&[a, b], &[], &[], &[]);
        let none = HashSet::new();

        let unfiltered = run(&games, &base_state(), Tab::All, &none, &none).len();
        for f in [
            {
                let mut f = base_state();
                f.free_only = true;
                f
            },
            {
                let mut f = base_state();
                f.include_tags = vec!["Survival".into()];
                f
            },
            {
                let mut f = base_state();
                f.exclude_tags = vec!["Horror".into()];
                f
            },
        ] {
            assert!(run(&games, &f, Tab::All, &none, &none).len() <= unfiltered);
        }
    }

    #[test]
    fn tab_counts_cover_every_tab() {
        let games = build_ownership(&[game(1, "A"), game(2, "B")], &[], &[], &[]);
        let shortlisted: HashSet<i64> = [1].into();
        let excluded: HashSet<i64> = [2].into();
        let counts = tab_counts(
            &games,
            &base_state(),
            &shortlisted,
            &excluded,
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        );
        assert_eq!(counts[&Tab::All], 1);
        assert_eq!(counts[&Tab::Shortlisted], 1);
        assert_eq!(counts[&Tab::Excluded], 1);
        assert_eq!(counts[&Tab::Trending], 0);
    }
}
