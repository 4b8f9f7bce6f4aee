use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::warn;

/// One leaderboard row as returned by [`RankStore::top_n`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub display_name: String,
    pub luck: u64,
}

/// Persisted per-date leaderboard:
/// `{"<date>": {"<user>": {"name": ..., "luck": ...}}}`.
///
/// `update` is the one read-modify-write in the fortune core that must not
/// interleave: the lock is held across load, mutate and persist so two
/// draws in the same tick cannot clobber each other. One lock guards the
/// whole file; contention is low enough that per-date granularity is not
/// worth it.
#[derive(Debug)]
pub struct RankStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl RankStore {
    pub fn new(path: PathBuf) -> Self {
        RankStore {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Map<String, Value> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return Map::new(),
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %self.path.display(), "rank file is not an object, starting fresh");
                Map::new()
            }
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "rank file unreadable, starting fresh");
                Map::new()
            }
        }
    }

    /// Write the document to a temp sibling and rename it into place, so a
    /// crash mid-write never leaves a truncated rank file.
    fn persist(&self, doc: &Map<String, Value>) -> Result<()> {
        let content = serde_json::to_string_pretty(doc)
            .context("Failed to serialize rank document")?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)
            .context("Failed to write rank temp file")?;
        std::fs::rename(&tmp, &self.path)
            .context("Failed to move rank file into place")?;
        Ok(())
    }

    /// Upsert the entry for (date, user), last write wins within a day.
    pub async fn update(
        &self,
        user_id: &str,
        display_name: &str,
        luck: u32,
        date: &str,
    ) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut doc = self.load();
        let day = doc
            .entry(date.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !day.is_object() {
            *day = Value::Object(Map::new());
        }
        if let Some(day_map) = day.as_object_mut() {
            day_map.insert(
                user_id.to_string(),
                json!({"name": display_name, "luck": luck}),
            );
        }

        self.persist(&doc)
    }

    /// Up to `n` entries for `date`, luck descending; ties keep insertion
    /// order. Malformed entries are skipped rather than failing the query.
    pub fn top_n(&self, date: &str, n: usize) -> Vec<RankEntry> {
        let doc = self.load();
        let Some(day) = doc.get(date).and_then(Value::as_object) else {
            return Vec::new();
        };

        let mut entries: Vec<RankEntry> = day
            .values()
            .filter_map(|entry| {
                let display_name = entry.get("name")?.as_str()?.to_string();
                let luck = entry.get("luck")?.as_u64()?;
                Some(RankEntry { display_name, luck })
            })
            .collect();

        // Vec::sort_by is stable, preserving insertion order on ties.
        entries.sort_by(|a, b| b.luck.cmp(&a.luck));
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DATE: &str = "2026-08-25";

    fn store_in(dir: &TempDir) -> RankStore {
        RankStore::new(dir.path().join("rank.json"))
    }

    #[tokio::test]
    async fn test_top_n_orders_desc_with_stable_ties() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.update("a", "A", 50, DATE).await.unwrap();
        store.update("b", "B", 90, DATE).await.unwrap();
        store.update("c", "C", 90, DATE).await.unwrap();

        let names: Vec<String> = store
            .top_n(DATE, 10)
            .into_iter()
            .map(|e| e.display_name)
            .collect();
        assert_eq!(names, vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_top_n_truncates() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for (id, luck) in [("a", 10), ("b", 20), ("c", 30)] {
            store.update(id, id, luck, DATE).await.unwrap();
        }
        assert_eq!(store.top_n(DATE, 2).len(), 2);
        assert!(store.top_n("2026-01-01", 5).is_empty());
    }

    #[tokio::test]
    async fn test_update_overwrites_same_day_entry() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.update("a", "A", 10, DATE).await.unwrap();
        store.update("a", "A renamed", 77, DATE).await.unwrap();

        let entries = store.top_n(DATE, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "A renamed");
        assert_eq!(entries[0].luck, 77);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.update("a", "A", 42, DATE).await.unwrap();
        let once = std::fs::read_to_string(dir.path().join("rank.json")).unwrap();
        store.update("a", "A", 42, DATE).await.unwrap();
        let twice = std::fs::read_to_string(dir.path().join("rank.json")).unwrap();

        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_concurrent_updates_both_persist() {
        let dir = TempDir::new().unwrap();
        let store = std::sync::Arc::new(store_in(&dir));

        let s1 = store.clone();
        let s2 = store.clone();
        let (r1, r2) = tokio::join!(
            async move { s1.update("a", "A", 11, DATE).await },
            async move { s2.update("b", "B", 22, DATE).await },
        );
        r1.unwrap();
        r2.unwrap();

        let entries = store.top_n(DATE, 10);
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_entries_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("rank.json"),
            format!(
                r#"{{"{}": {{
                    "ok": {{"name": "OK", "luck": 60}},
                    "bad_luck": {{"name": "X", "luck": "ninety"}},
                    "no_name": {{"luck": 80}}
                }}}}"#,
                DATE
            ),
        )
        .unwrap();

        let store = store_in(&dir);
        let entries = store.top_n(DATE, 10);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].display_name, "OK");
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.update("a", "A", 1, DATE).await.unwrap();
        assert!(!dir.path().join("rank.json.tmp").exists());
        assert!(dir.path().join("rank.json").exists());
    }
}
