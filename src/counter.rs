use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

type CountDoc = HashMap<String, HashMap<String, u64>>;

/// Per-day draw counter, persisted as `{"<date>": {"<user>": count}}`.
///
/// Reads swallow every failure and report 0. Writes follow the original
/// design: full-document read-modify-write with no lock, so racing
/// increments in the same tick can lose an update. Single logical writer
/// assumed.
#[derive(Debug, Clone)]
pub struct QueryCounter {
    path: PathBuf,
}

impl QueryCounter {
    pub fn new(path: PathBuf) -> Self {
        QueryCounter { path }
    }

    fn load(&self) -> CountDoc {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return CountDoc::new(),
        };
        match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, path = %self.path.display(), "query-count file unreadable, treating as empty");
                CountDoc::new()
            }
        }
    }

    /// Times `user_id` has drawn on `date`; 0 when absent or on any read
    /// failure.
    pub fn get_count(&self, user_id: &str, date: &str) -> u64 {
        self.load()
            .get(date)
            .and_then(|day| day.get(user_id))
            .copied()
            .unwrap_or(0)
    }

    /// Bump the counter for (date, user) and persist the whole document.
    pub fn increment(&self, user_id: &str, date: &str) -> Result<()> {
        let mut doc = self.load();
        let count = doc
            .entry(date.to_string())
            .or_default()
            .entry(user_id.to_string())
            .or_insert(0);
        *count += 1;

        let content = serde_json::to_string_pretty(&doc)
            .context("Failed to serialize query counts")?;
        std::fs::write(&self.path, content)
            .context("Failed to write query-count file")?;
        Ok(())
    }
}
