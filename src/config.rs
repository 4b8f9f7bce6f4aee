use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::warn;

/// Activities suggested when the configuration carries no custom lists.
pub const DEFAULT_GOOD_ACTIVITIES: &[&str] = &[
    "摸鱼", "写代码", "出门散步", "抽卡", "睡懒觉", "请朋友喝奶茶",
];
pub const DEFAULT_BAD_ACTIVITIES: &[&str] = &[
    "熬夜", "剁手", "开会", "理发", "和人抬杠", "改需求",
];

const DEFAULT_MAX_PER_DAY: u64 = 1;

/// Nested JSON configuration document persisted under the plugin data
/// directory. Loaded documents are deep-merged over the built-in defaults
/// so newly introduced default keys appear for existing installations.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    data_dir: PathBuf,
    doc: Value,
}

fn default_document() -> Value {
    json!({
        "features": {
            "fortune": true,
            "rank": true,
            "greetings": true,
            "impersonate": true
        },
        "fortune": {
            "max_per_day": DEFAULT_MAX_PER_DAY,
            "prompt_template": [
                "你是一个幽默的群聊占卜师。",
                "今天是{date}，{user_name}抽到的今日人品值是{luck_value}，运势等级「{luck_level}」。",
                "请用不超过50字、轻松俏皮的一两句话点评这个运势。"
            ],
            "custom_good_list": [],
            "custom_bad_list": []
        },
        "greetings": {
            "morning": [
                "早安，{user_name}！今天也要元气满满哦",
                "{user_name} 早上好，新的一天开始啦"
            ],
            "night": [
                "晚安，{user_name}，好梦",
                "{user_name} 晚安，明天见"
            ]
        }
    })
}

/// Recursively merge `patch` into `base`. Nested objects merge key-wise
/// with patch leaves winning; any other value pair is replaced wholesale.
/// Keys present only in `base` are retained.
pub fn deep_merge(base: Value, patch: Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                match base_map.remove(&key) {
                    Some(base_value) => {
                        base_map.insert(key, deep_merge(base_value, patch_value));
                    }
                    None => {
                        base_map.insert(key, patch_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, patch) => patch,
    }
}

impl ConfigStore {
    pub fn new(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("groupfun")
        });

        std::fs::create_dir_all(&data_dir)
            .context("Failed to create plugin data directory")?;

        let doc = Self::load(&data_dir)?;
        Ok(ConfigStore { data_dir, doc })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn config_path(data_dir: &Path) -> PathBuf {
        data_dir.join("config.json")
    }

    pub fn rank_file(&self) -> PathBuf {
        self.data_dir.join("rank.json")
    }

    pub fn counter_file(&self) -> PathBuf {
        self.data_dir.join("query_count.json")
    }

    /// Load the persisted document merged over the defaults. A missing file
    /// is bootstrapped with the defaults; a corrupt file falls back to the
    /// defaults with a warning and never fails the caller.
    fn load(data_dir: &Path) -> Result<Value> {
        let path = Self::config_path(data_dir);
        let defaults = default_document();

        if !path.exists() {
            let content = serde_json::to_string_pretty(&defaults)
                .context("Failed to serialize default config")?;
            std::fs::write(&path, content)
                .context("Failed to write default config.json")?;
            return Ok(defaults);
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, path = %path.display(), "config read failed, using defaults");
                return Ok(defaults);
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(user_doc) => Ok(deep_merge(defaults, user_doc)),
            Err(e) => {
                warn!(error = %e, path = %path.display(), "config parse failed, using defaults");
                Ok(defaults)
            }
        }
    }

    /// Persist `doc`, backing the previous file up to a `.bak` sibling
    /// first. The in-memory document is replaced only once the write has
    /// succeeded, so a failed save leaves state untouched.
    pub fn save(&mut self, doc: Value) -> bool {
        let path = Self::config_path(&self.data_dir);

        if path.exists() {
            let backup = path.with_extension("json.bak");
            if let Err(e) = std::fs::copy(&path, &backup) {
                warn!(error = %e, "config backup failed, saving anyway");
            }
        }

        let content = match serde_json::to_string_pretty(&doc) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "config serialization failed");
                return false;
            }
        };
        if let Err(e) = std::fs::write(&path, content) {
            warn!(error = %e, path = %path.display(), "config write failed");
            return false;
        }

        self.doc = doc;
        true
    }

    /// Deep-merge `patch` into the active document and persist the result.
    pub fn update(&mut self, patch: Value) -> bool {
        let merged = deep_merge(self.doc.clone(), patch);
        self.save(merged)
    }

    pub fn document(&self) -> &Value {
        &self.doc
    }

    pub fn feature_enabled(&self, name: &str) -> bool {
        self.doc["features"][name].as_bool().unwrap_or(false)
    }

    /// Daily draw cap; 0 disables limiting. Malformed values degrade to the
    /// built-in default rather than failing the draw.
    pub fn max_per_day(&self) -> u64 {
        self.doc["fortune"]["max_per_day"]
            .as_u64()
            .unwrap_or(DEFAULT_MAX_PER_DAY)
    }

    /// Configured prompt template: an ordered fragment array is concatenated
    /// in order, a scalar string is returned as-is, anything else — including
    /// an array holding a non-string fragment — yields "".
    pub fn fortune_prompt(&self) -> String {
        match &self.doc["fortune"]["prompt_template"] {
            Value::String(s) => s.clone(),
            Value::Array(fragments) => {
                let mut parts = Vec::with_capacity(fragments.len());
                for fragment in fragments {
                    match fragment.as_str() {
                        Some(s) => parts.push(s),
                        None => return String::new(),
                    }
                }
                parts.concat()
            }
            _ => String::new(),
        }
    }

    pub fn good_list(&self) -> Vec<String> {
        self.activity_list("custom_good_list", DEFAULT_GOOD_ACTIVITIES)
    }

    pub fn bad_list(&self) -> Vec<String> {
        self.activity_list("custom_bad_list", DEFAULT_BAD_ACTIVITIES)
    }

    fn activity_list(&self, key: &str, defaults: &[&str]) -> Vec<String> {
        let configured: Vec<String> = self.doc["fortune"][key]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        if configured.is_empty() {
            defaults.iter().map(|s| s.to_string()).collect()
        } else {
            configured
        }
    }

    /// Response templates for a greeting trigger kind ("morning", "night").
    pub fn greeting_templates(&self, kind: &str) -> Vec<String> {
        self.doc["greetings"][kind]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|i| i.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::new(Some(dir.path().to_path_buf())).unwrap()
    }

    #[test]
    fn test_deep_merge_nested() {
        let base = json!({"a": {"x": 1, "y": 2}});
        let patch = json!({"a": {"y": 9, "z": 3}});
        assert_eq!(deep_merge(base, patch), json!({"a": {"x": 1, "y": 9, "z": 3}}));
    }

    #[test]
    fn test_deep_merge_replaces_non_mappings_wholesale() {
        let base = json!({"a": {"x": 1}, "b": [1, 2]});
        let patch = json!({"a": "flat", "b": [3]});
        assert_eq!(deep_merge(base, patch), json!({"a": "flat", "b": [3]}));
    }

    #[test]
    fn test_fresh_install_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        assert!(dir.path().join("config.json").exists());
        assert_eq!(store.document(), &default_document());
        assert!(store.feature_enabled("fortune"));
    }

    #[test]
    fn test_existing_document_merged_over_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{"fortune": {"max_per_day": 3}}"#,
        )
        .unwrap();

        let store = store_in(&dir);
        assert_eq!(store.max_per_day(), 3);
        // Untouched default keys survive the merge.
        assert!(store.feature_enabled("rank"));
        assert!(!store.fortune_prompt().is_empty());
    }

    #[test]
    fn test_corrupt_document_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("config.json"), "{not json").unwrap();

        let store = store_in(&dir);
        assert_eq!(store.document(), &default_document());
    }

    #[test]
    fn test_save_round_trip_and_backup() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        let mut doc = store.document().clone();
        doc["fortune"]["max_per_day"] = json!(5);
        assert!(store.save(doc.clone()));
        assert!(dir.path().join("config.json.bak").exists());

        let reloaded = store_in(&dir);
        assert_eq!(reloaded.document(), &doc);
    }

    #[test]
    fn test_update_merges_patch() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(store.update(json!({"features": {"rank": false}})));
        assert!(!store.feature_enabled("rank"));
        // Sibling feature flags are untouched.
        assert!(store.feature_enabled("fortune"));
    }

    #[test]
    fn test_fortune_prompt_forms() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert!(store.update(json!({"fortune": {"prompt_template": ["a", "b", "a"]}})));
        assert_eq!(store.fortune_prompt(), "aba");

        assert!(store.update(json!({"fortune": {"prompt_template": "single"}})));
        assert_eq!(store.fortune_prompt(), "single");

        assert!(store.update(json!({"fortune": {"prompt_template": 42}})));
        assert_eq!(store.fortune_prompt(), "");

        // A non-string fragment poisons the whole template.
        assert!(store.update(json!({"fortune": {"prompt_template": ["a", 42]}})));
        assert_eq!(store.fortune_prompt(), "");
    }

    #[test]
    fn test_failed_save_leaves_memory_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        let before = store.document().clone();

        // A directory where the file should be makes the write fail.
        std::fs::remove_file(dir.path().join("config.json")).unwrap();
        std::fs::create_dir(dir.path().join("config.json")).unwrap();

        let mut doc = before.clone();
        doc["fortune"]["max_per_day"] = json!(9);
        assert!(!store.save(doc));
        assert_eq!(store.document(), &before);
    }

    #[test]
    fn test_unreadable_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        // A directory named config.json exists but cannot be read as a file.
        std::fs::create_dir(dir.path().join("config.json")).unwrap();

        let store = store_in(&dir);
        assert_eq!(store.document(), &default_document());
    }

    #[test]
    fn test_activity_lists_default_when_unset() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);

        assert_eq!(store.good_list().len(), DEFAULT_GOOD_ACTIVITIES.len());

        assert!(store.update(json!({"fortune": {"custom_good_list": ["逛街"]}})));
        assert_eq!(store.good_list(), vec!["逛街".to_string()]);
    }

    #[test]
    fn test_non_ascii_preserved_on_disk() {
        let dir = TempDir::new().unwrap();
        let _ = store_in(&dir);

        let raw = std::fs::read_to_string(dir.path().join("config.json")).unwrap();
        assert!(raw.contains("晚安"));
        assert!(!raw.contains("\\u"));
    }
}
