//! Per-tab configuration bundles with a versioned loader. Persisted blobs
//! from older builds are migrated (the sort key used to be a single string,
//! and v1 was a flat single-tab object with camelCase keys), then merged
//! field-by-field over fresh defaults so new fields always pick up a
//! default even from old state.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::filters::{GameModeMask, ProtonFloor, ReleaseWindow, Tab};
use super::sort::SortKey;
use crate::util::kv::KvStore;

pub const CONFIG_NAMESPACE: &str = "config";
pub const THEME_NAMESPACE: &str = "theme";

const CONFIG_VERSION: u64 = 2;

/// Default filter/sort/mode bundle for one tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabConfig {
    pub min_review_count: i32,
    pub linux_only: bool,
    pub release_window: ReleaseWindow,
    pub game_modes: GameModeMask,
    pub exclude_tags: Vec<String>,
    pub sort_keys: Vec<SortKey>,
    pub proton_floor: ProtonFloor,
}

impl TabConfig {
    pub fn default_for(tab: Tab) -> Self {
        let mut cfg = Self {
            min_review_count: 150,
            linux_only: false,
            release_window: ReleaseWindow::All,
            game_modes: GameModeMask {
                multiplayer: true,
                coop: true,
                single_player: false,
                local_multiplayer: false,
            },
            exclude_tags: vec!["Massively Multiplayer".to_string()],
            sort_keys: vec![SortKey::default_for(tab)],
            proton_floor: ProtonFloor::All,
        };
        match tab {
            // The "new" tab gets its character from this default, not from a
            // structural predicate.
            Tab::New => cfg.release_window = ReleaseWindow::ThreeMonths,
            Tab::Excluded => cfg.exclude_tags.clear(),
            _ => {}
        }
        cfg
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub version: u64,
    pub tabs: BTreeMap<Tab, TabConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            tabs: Tab::ALL
                .iter()
                .map(|t| (*t, TabConfig::default_for(*t)))
                .collect(),
        }
    }
}

impl AppConfig {
    /// Resolved bundle for a tab; tabs absent from the persisted blob get
    /// their defaults.
    pub fn resolve(&self, tab: Tab) -> TabConfig {
        self.tabs
            .get(&tab)
            .cloned()
            .unwrap_or_else(|| TabConfig::default_for(tab))
    }
}

pub fn load_config(kv: &KvStore) -> AppConfig {
    let Some(raw) = kv.load_raw(CONFIG_NAMESPACE) else {
        return AppConfig::default();
    };
    decode(migrate(raw))
}

pub fn save_config(kv: &KvStore, config: &AppConfig) -> anyhow::Result<()> {
    kv.save(CONFIG_NAMESPACE, config)
}

/// Bring any known legacy shape up to the current one.
fn migrate(raw: Value) -> Value {
    let Value::Object(obj) = raw else {
        return Value::Object(Map::new());
    };
    let version = obj.get("version").and_then(Value::as_u64).unwrap_or(1);
    if version >= CONFIG_VERSION {
        let mut out = Map::new();
        out.insert("version".into(), Value::from(version));
        let mut tabs = Map::new();
        if let Some(Value::Object(saved_tabs)) = obj.get("tabs") {
            for (tab, cfg) in saved_tabs {
                tabs.insert(tab.clone(), normalize_tab_object(cfg.clone()));
            }
        }
        out.insert("tabs".into(), Value::Object(tabs));
        return Value::Object(out);
    }

    // v1: one flat bundle applying to the "all" tab, camelCase keys.
    let flat = normalize_tab_object(Value::Object(obj));
    let mut tabs = Map::new();
    tabs.insert("all".into(), flat);
    let mut out = Map::new();
    out.insert("version".into(), Value::from(CONFIG_VERSION));
    out.insert("tabs".into(), Value::Object(tabs));
    Value::Object(out)
}

/// Rename legacy keys and coerce the old single-string sort key into a
/// one-element stack.
fn normalize_tab_object(v: Value) -> Value {
    let Value::Object(obj) = v else {
        return Value::Object(Map::new());
    };
    let mut out = Map::new();
    for (key, value) in obj {
        let key = match key.as_str() {
            "defaultSortBy" | "sortBy" | "sort_by" => "sort_keys",
            "defaultExcludeTags" | "excludeTags" => "exclude_tags",
            "defaultLinuxOnly" | "linuxOnly" => "linux_only",
            "defaultReleaseDateFilter" | "releaseDateFilter" => "release_window",
            "defaultGameModes" | "gameModes" => "game_modes",
            "defaultProtonFilter" | "protonFilter" => "proton_floor",
            "minReviewCount" => "min_review_count",
            other => other,
        }
        .to_string();
        let value = match (key.as_str(), value) {
            ("sort_keys", Value::String(s)) => Value::Array(vec![Value::String(s)]),
            ("game_modes", Value::Object(modes)) => {
                let mut renamed = Map::new();
                for (mk, mv) in modes {
                    let mk = match mk.as_str() {
                        "singlePlayer" => "single_player",
                        "localMultiplayer" => "local_multiplayer",
                        other => other,
                    };
                    renamed.insert(mk.to_string(), mv);
                }
                Value::Object(renamed)
            }
            (_, value) => value,
        };
        out.insert(key, value);
    }
    Value::Object(out)
}

/// Field-wise merge of the migrated blob over per-tab defaults. A tab that
/// fails to decode falls back to its defaults rather than poisoning load.
fn decode(migrated: Value) -> AppConfig {
    let saved_tabs = migrated
        .get("tabs")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let mut tabs = BTreeMap::new();
    for tab in Tab::ALL {
        let tab_key = serde_json::to_value(tab)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let defaults = TabConfig::default_for(tab);
        let mut merged = serde_json::to_value(&defaults).unwrap_or(Value::Null);
        if let Some(saved) = saved_tabs.get(&tab_key) {
            merge_into(&mut merged, saved);
        }
        let cfg = serde_json::from_value(merged).unwrap_or_else(|e| {
            tracing::warn!(tab = %tab_key, error = %e, "unusable tab config, using defaults");
            defaults
        });
        tabs.insert(tab, cfg);
    }

    AppConfig {
        version: CONFIG_VERSION,
        tabs,
    }
}

fn merge_into(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_obj), Value::Object(overlay_obj)) => {
            for (key, value) in overlay_obj {
                match base_obj.get_mut(key) {
                    Some(slot) => merge_into(slot, value),
                    None => {
                        base_obj.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// UI theme preference, persisted under its own namespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

pub fn load_theme(kv: &KvStore) -> Theme {
    kv.load(THEME_NAMESPACE)
}

pub fn save_theme(kv: &KvStore, theme: Theme) -> anyhow::Result<()> {
    kv.save(THEME_NAMESPACE, &theme)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv() -> (tempfile::TempDir, KvStore) {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        (dir, kv)
    }

    #[test]
    fn absent_blob_loads_defaults() {
        let (_dir, kv) = kv();
        let config = load_config(&kv);
        assert_eq!(config, AppConfig::default());
        assert_eq!(
            config.resolve(Tab::Trending).sort_keys,
            vec![SortKey::Trending]
        );
    }

    #[test]
    fn legacy_flat_blob_migrates_to_all_tab() {
        let (_dir, kv) = kv();
        kv.save(
            CONFIG_NAMESPACE,
            &serde_json::json!({
                "minReviewCount": 50,
                "defaultLinuxOnly": true,
                "defaultSortBy": "review_score",
                "defaultExcludeTags": ["Sports"],
                "defaultGameModes": { "multiplayer": false, "singlePlayer": true },
            }),
        )
        .unwrap();

        let config = load_config(&kv);
        let all = config.resolve(Tab::All);
        assert_eq!(all.min_review_count, 50);
        assert!(all.linux_only);
        assert_eq!(all.sort_keys, vec![SortKey::ReviewScore]);
        assert_eq!(all.exclude_tags, vec!["Sports".to_string()]);
        assert!(!all.game_modes.multiplayer);
        assert!(all.game_modes.single_player);
        // Field absent from the old blob keeps its default.
        assert!(all.game_modes.coop);
        // Other tabs are untouched by a v1 blob.
        assert_eq!(
            config.resolve(Tab::Trending),
            TabConfig::default_for(Tab::Trending)
        );
    }

    #[test]
    fn v2_partial_blob_merges_over_defaults() {
        let (_dir, kv) = kv();
        kv.save(
            CONFIG_NAMESPACE,
            &serde_json::json!({
                "version": 2,
                "tabs": {
                    "new": { "release_window": "week", "sort_by": "name" }
                }
            }),
        )
        .unwrap();

        let config = load_config(&kv);
        let new_tab = config.resolve(Tab::New);
        assert_eq!(new_tab.release_window, ReleaseWindow::Week);
        assert_eq!(new_tab.sort_keys, vec![SortKey::Name]);
        assert_eq!(new_tab.min_review_count, 150);
    }

    #[test]
    fn garbage_blob_resets_to_defaults() {
        let (_dir, kv) = kv();
        kv.save(CONFIG_NAMESPACE, &serde_json::json!([1, 2, 3])).unwrap();
        assert_eq!(load_config(&kv), AppConfig::default());
    }

    #[test]
    fn config_round_trips() {
        let (_dir, kv) = kv();
        let mut config = AppConfig::default();
        config
            .tabs
            .get_mut(&Tab::All)
            .unwrap()
            .sort_keys
            .push(SortKey::Playtime);
        save_config(&kv, &config).unwrap();
        assert_eq!(load_config(&kv), config);
    }

    #[test]
    fn theme_round_trips_and_defaults_dark() {
        let (_dir, kv) = kv();
        assert_eq!(load_theme(&kv), Theme::Dark);
        save_theme(&kv, Theme::Light).unwrap();
        assert_eq!(load_theme(&kv), Theme::Light);
    }
}
