//! Entertainment plugin for group-chat bots.
//!
//! The core is the fortune subsystem: a deterministic per-(user, date)
//! luck draw, a per-day query cap, LLM-generated commentary and a
//! persisted daily leaderboard. Greeting replies and fabricated messages
//! ride along as thin handlers over the same configuration store.
//!
//! The chat transport, command dispatch and the LLM backend itself are the
//! host's business; they reach this crate through [`provider::ProviderHub`]
//! and [`provider::LlmBackend`], and entry points return plain data for the
//! host to render.

pub mod config;
pub mod counter;
pub mod draw;
pub mod engine;
pub mod greet;
pub mod provider;
pub mod rank;

pub use config::{deep_merge, ConfigStore};
pub use counter::QueryCounter;
pub use draw::{luck_value, LuckLevel};
pub use engine::{DrawOutcome, FortuneEngine, FortuneResult, FALLBACK_COMMENTARY};
pub use greet::{greeting_reply, impersonate, FakeMessage};
pub use provider::{LlmBackend, ProviderDescriptor, ProviderHub, ProviderKind};
pub use rank::{RankEntry, RankStore};
