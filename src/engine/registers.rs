//! Shortlist and exclusion registers: two independent client-persisted
//! annotation maps over game id. Loaded eagerly at startup, re-persisted on
//! every mutation, and never written to the canonical store.

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::util::kv::KvStore;

pub const SHORTLIST_NAMESPACE: &str = "shortlist";
pub const EXCLUDED_NAMESPACE: &str = "excluded";

/// A championed candidate: which players pushed for it, and why.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    #[serde(default)]
    pub players: IndexSet<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusionEntry {
    pub reason: String,
    pub excluded_by: String,
}

type ShortlistMap = IndexMap<i64, ShortlistEntry>;
type ExclusionMap = IndexMap<i64, ExclusionEntry>;

pub struct ShortlistRegister {
    kv: KvStore,
    entries: ShortlistMap,
}

impl ShortlistRegister {
    pub fn load(kv: KvStore) -> Self {
        let entries = kv.load(SHORTLIST_NAMESPACE);
        Self { kv, entries }
    }

    fn persist(&self) -> Result<()> {
        self.kv.save(SHORTLIST_NAMESPACE, &self.entries)
    }

    pub fn is_shortlisted(&self, game_id: i64) -> bool {
        self.entries.contains_key(&game_id)
    }

    pub fn entry(&self, game_id: i64) -> Option<&ShortlistEntry> {
        self.entries.get(&game_id)
    }

    pub fn ids(&self) -> HashSet<i64> {
        self.entries.keys().copied().collect()
    }

    /// Toggle membership; returns true when the game is now shortlisted.
    pub fn toggle(&mut self, game_id: i64) -> Result<bool> {
        let now_on = if self.entries.shift_remove(&game_id).is_some() {
            false
        } else {
            self.entries.insert(game_id, ShortlistEntry::default());
            true
        };
        self.persist()?;
        Ok(now_on)
    }

    /// Toggle a named player's championing of an already-shortlisted game.
    /// No-op for games not on the list.
    pub fn toggle_player(&mut self, game_id: i64, player_name: &str) -> Result<()> {
        if let Some(entry) = self.entries.get_mut(&game_id) {
            if !entry.players.shift_remove(player_name) {
                entry.players.insert(player_name.to_string());
            }
            self.persist()?;
        }
        Ok(())
    }

    pub fn set_reason(&mut self, game_id: i64, reason: &str) -> Result<()> {
        if let Some(entry) = self.entries.get_mut(&game_id) {
            entry.reason = reason.to_string();
            self.persist()?;
        }
        Ok(())
    }
}

pub struct ExclusionRegister {
    kv: KvStore,
    entries: ExclusionMap,
}

impl ExclusionRegister {
    pub fn load(kv: KvStore) -> Self {
        let entries = kv.load(EXCLUDED_NAMESPACE);
        Self { kv, entries }
    }

    fn persist(&self) -> Result<()> {
        self.kv.save(EXCLUDED_NAMESPACE, &self.entries)
    }

    pub fn is_excluded(&self, game_id: i64) -> bool {
        self.entries.contains_key(&game_id)
    }

    pub fn entry(&self, game_id: i64) -> Option<&ExclusionEntry> {
        self.entries.get(&game_id)
    }

    pub fn ids(&self) -> HashSet<i64> {
        self.entries.keys().copied().collect()
    }

    /// Exclusions always carry a reason and the name of the excluder.
    pub fn exclude(&mut self, game_id: i64, reason: &str, excluded_by: &str) -> Result<()> {
        self.entries.insert(
            game_id,
            ExclusionEntry {
                reason: reason.to_string(),
                excluded_by: excluded_by.to_string(),
            },
        );
        self.persist()
    }

    pub fn restore(&mut self, game_id: i64) -> Result<()> {
        if self.entries.shift_remove(&game_id).is_some() {
            self.persist()?;
        }
        Ok(())
    }
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
    fn shortlist_toggle_survives_reload() {
        let (_dir, kv) = kv();
        let mut register = ShortlistRegister::load(kv.clone());
        assert!(register.toggle(7).unwrap());
        register.toggle_player(7, "ana").unwrap();
        register.toggle_player(7, "bo").unwrap();
        register.set_reason(7, "friday night").unwrap();

        let reloaded = ShortlistRegister::load(kv);
        let entry = reloaded.entry(7).unwrap();
        let players: Vec<&String> = entry.players.iter().collect();
        assert_eq!(players, vec!["ana", "bo"]);
        assert_eq!(entry.reason, "friday night");
    }

    #[test]
    fn shortlist_untoggle_deletes_annotation() {
        let (_dir, kv) = kv();
        let mut register = ShortlistRegister::load(kv.clone());
        register.toggle(7).unwrap();
        register.set_reason(7, "maybe").unwrap();
        assert!(!register.toggle(7).unwrap());
        assert!(register.entry(7).is_none());

        let reloaded = ShortlistRegister::load(kv);
        assert!(!reloaded.is_shortlisted(7));
    }

    #[test]
    fn champion_toggle_is_order_preserving() {
        let (_dir, kv) = kv();
        let mut register = ShortlistRegister::load(kv);
        register.toggle(1).unwrap();
        register.toggle_player(1, "cy").unwrap();
        register.toggle_player(1, "ana").unwrap();
        register.toggle_player(1, "cy").unwrap();
        let players: Vec<&String> = register.entry(1).unwrap().players.iter().collect();
        assert_eq!(players, vec!["ana"]);
    }

    #[test]
    fn exclusion_requires_explicit_restore() {
        let (_dir, kv) = kv();
        let mut register = ExclusionRegister::load(kv.clone());
        register.exclude(9, "servers are dead", "bo").unwrap();
        assert!(register.is_excluded(9));
        assert_eq!(register.entry(9).unwrap().excluded_by, "bo");

        let mut reloaded = ExclusionRegister::load(kv);
        assert!(reloaded.is_excluded(9));
        reloaded.restore(9).unwrap();
        assert!(!reloaded.is_excluded(9));
    }

    #[test]
    fn registers_are_independent() {
        let (_dir, kv) = kv();
        let mut shortlist = ShortlistRegister::load(kv.clone());
        let mut excluded = ExclusionRegister::load(kv.clone());
        shortlist.toggle(1).unwrap();
        excluded.exclude(1, "nope", "ana").unwrap();
        assert!(ShortlistRegister::load(kv.clone()).is_shortlisted(1));
        assert!(ExclusionRegister::load(kv).is_excluded(1));
    }
}
