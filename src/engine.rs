use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ConfigStore;
use crate::counter::QueryCounter;
use crate::draw::{luck_value, pick_activities, LuckLevel};
use crate::provider::{candidate_ids, LlmBackend, ProviderHub};
use crate::rank::{RankEntry, RankStore};

/// Commentary used whenever no provider produces text. The draw itself
/// always completes.
pub const FALLBACK_COMMENTARY: &str = "今天运势不错，但要保持乐观哦！";

/// Template used when the configured one is empty or malformed.
const BUILTIN_PROMPT: &str =
    "今天是{date}，{user_name}的今日人品值是{luck_value}，运势等级「{luck_level}」。请用一两句话给出简短幽默的运势点评。";

const LLM_TIMEOUT: Duration = Duration::from_secs(30);

/// A completed fortune draw for one user on one date.
#[derive(Debug, Clone)]
pub struct FortuneResult {
    pub display_name: String,
    pub luck_value: u32,
    pub luck_level: LuckLevel,
    pub good_activity: String,
    pub bad_activity: String,
    pub commentary: String,
}

impl FortuneResult {
    /// Plain-text rendering handed back to the chat transport.
    pub fn render(&self) -> String {
        format!(
            "🔮 {} 的今日运势\n人品值：{}（{}）\n宜：{}\n忌：{}\n{}",
            self.display_name,
            self.luck_value,
            self.luck_level,
            self.good_activity,
            self.bad_activity,
            self.commentary
        )
    }
}

#[derive(Debug, Clone)]
pub enum DrawOutcome {
    Completed(FortuneResult),
    /// Daily cap hit; carries the current count for the refusal message.
    LimitReached { count: u64 },
    /// Fortune feature switched off; the host should stay silent.
    Disabled,
}

/// Orchestrates the daily draw: query limit, deterministic luck value,
/// activity picks, LLM commentary, then counter and leaderboard updates.
pub struct FortuneEngine {
    config: ConfigStore,
    counter: QueryCounter,
    rank: RankStore,
    hub: Arc<dyn ProviderHub>,
    llm: Arc<dyn LlmBackend>,
}

impl FortuneEngine {
    pub fn new(config: ConfigStore, hub: Arc<dyn ProviderHub>, llm: Arc<dyn LlmBackend>) -> Self {
        let counter = QueryCounter::new(config.counter_file());
        let rank = RankStore::new(config.rank_file());
        FortuneEngine {
            config,
            counter,
            rank,
            hub,
            llm,
        }
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ConfigStore {
        &mut self.config
    }

    /// Leaderboard for `date`, best luck first.
    pub fn leaderboard(&self, date: NaiveDate, n: usize) -> Vec<RankEntry> {
        self.rank.top_n(&date.format("%Y-%m-%d").to_string(), n)
    }

    /// Run one fortune draw for `user_id` on `date`.
    ///
    /// Never fails: configuration, persistence and LLM problems all degrade
    /// (defaults, logged warnings, fallback commentary) rather than
    /// surfacing an error to the chat user.
    pub async fn draw(&self, user_id: &str, display_name: &str, date: NaiveDate) -> DrawOutcome {
        if !self.config.feature_enabled("fortune") {
            return DrawOutcome::Disabled;
        }

        let date_str = date.format("%Y-%m-%d").to_string();
        let max_per_day = self.config.max_per_day();
        if max_per_day > 0 {
            let count = self.counter.get_count(user_id, &date_str);
            if count >= max_per_day {
                return DrawOutcome::LimitReached { count };
            }
        }

        let luck = luck_value(user_id, &date_str);
        let level = LuckLevel::from_value(luck);
        let (good_activity, bad_activity) =
            pick_activities(&self.config.good_list(), &self.config.bad_list(), luck);

        let commentary = self
            .commentary(&date_str, display_name, luck, level)
            .await;

        let result = FortuneResult {
            display_name: display_name.to_string(),
            luck_value: luck,
            luck_level: level,
            good_activity,
            bad_activity,
            commentary,
        };

        if max_per_day > 0 {
            if let Err(e) = self.counter.increment(user_id, &date_str) {
                warn!(error = %e, user_id, "query-count update failed");
            }
        }
        if self.config.feature_enabled("rank") {
            if let Err(e) = self.rank.update(user_id, display_name, luck, &date_str).await {
                warn!(error = %e, user_id, "rank update failed");
            }
        }

        DrawOutcome::Completed(result)
    }

    /// Ask the first provider that answers for commentary text; every
    /// failure path (no provider, error, timeout, empty reply) degrades to
    /// the fixed fallback string.
    async fn commentary(
        &self,
        date: &str,
        user_name: &str,
        luck: u32,
        level: LuckLevel,
    ) -> String {
        let mut template = self.config.fortune_prompt();
        if template.is_empty() {
            template = BUILTIN_PROMPT.to_string();
        }
        let prompt = template
            .replace("{date}", date)
            .replace("{user_name}", user_name)
            .replace("{luck_level}", level.label())
            .replace("{luck_value}", &luck.to_string());

        for provider_id in candidate_ids(&*self.hub) {
            match timeout(LLM_TIMEOUT, self.llm.generate(&provider_id, &prompt)).await {
                Ok(Ok(text)) if !text.trim().is_empty() => {
                    debug!(provider_id, "commentary generated");
                    return text.trim().to_string();
                }
                Ok(Ok(_)) => {
                    warn!(provider_id, "provider returned empty commentary");
                }
                Ok(Err(e)) => {
                    warn!(provider_id, error = %e, "provider call failed");
                }
                Err(_) => {
                    warn!(provider_id, "provider call timed out");
                }
            }
        }

        FALLBACK_COMMENTARY.to_string()
    }
}
