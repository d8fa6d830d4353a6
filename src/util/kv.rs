//! Scoped key-value registers for client-local state (shortlist, exclusions,
//! theme, per-tab config). One JSON blob per namespace, loaded once at
//! startup and rewritten synchronously on every mutation. A missing or
//! malformed blob reads as the default value, never as an error.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;

use crate::util::env::env_opt;

const DEFAULT_STATE_DIR: &str = ".game-night";

#[derive(Debug, Clone)]
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create state dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// State dir from GAME_NIGHT_STATE_DIR, defaulting to ./.game-night.
    pub fn from_env() -> Result<Self> {
        let dir = env_opt("GAME_NIGHT_STATE_DIR").unwrap_or_else(|| DEFAULT_STATE_DIR.into());
        Self::open(dir)
    }

    fn blob_path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    /// Read a namespace blob; absent or unparsable content falls back to
    /// `T::default()` so stale state can never block startup.
    pub fn load<T>(&self, namespace: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        match fs::read_to_string(self.blob_path(namespace)) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(namespace, error = %e, "malformed state blob, resetting");
                T::default()
            }),
            Err(_) => T::default(),
        }
    }

    /// Raw variant for callers that migrate legacy shapes before decoding.
    pub fn load_raw(&self, namespace: &str) -> Option<serde_json::Value> {
        let raw = fs::read_to_string(self.blob_path(namespace)).ok()?;
        serde_json::from_str(&raw).ok()
    }

    pub fn save<T>(&self, namespace: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let path = self.blob_path(namespace);
        let raw = serde_json::to_string_pretty(value)?;
        fs::write(&path, raw)
            .with_context(|| format!("failed to persist {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_blob_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        let map: HashMap<String, String> = kv.load("nothing-here");
        assert!(map.is_empty());
    }

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        let mut map = HashMap::new();
        map.insert("42".to_string(), "keep".to_string());
        kv.save("shortlist", &map).unwrap();
        let back: HashMap<String, String> = kv.load("shortlist");
        assert_eq!(back, map);
    }

    #[test]
    fn malformed_blob_resets_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let kv = KvStore::open(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{not json").unwrap();
        let map: HashMap<String, i64> = kv.load("broken");
        assert!(map.is_empty());
    }
}
