use anyhow::Result;
use async_trait::async_trait;

/// Common provider identifiers probed in order when the host exposes
/// nothing better.
pub const COMMON_PROVIDER_IDS: &[&str] = &["openai", "ollama", "gemini", "deepseek", "zhipu"];

/// Capability a provider advertises. Commentary generation only wants
/// chat-completion providers; everything else (tts, image, ...) is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    ChatCompletion,
    Other,
}

/// Explicit description of one provider, supplied by the host integration
/// layer instead of being sniffed out of host internals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: String,
    pub kind: ProviderKind,
}

impl ProviderDescriptor {
    pub fn chat(id: impl Into<String>) -> Self {
        ProviderDescriptor {
            id: id.into(),
            kind: ProviderKind::ChatCompletion,
        }
    }
}

/// Host-side adapter answering "which providers exist right now".
pub trait ProviderHub: Send + Sync {
    /// The provider the host currently has selected, if any.
    fn selected(&self) -> Option<ProviderDescriptor>;

    /// All providers the host knows about.
    fn available(&self) -> Vec<ProviderDescriptor>;
}

/// The actual text-generation collaborator. One call per attempt; failures
/// are ordinary `Err` values, never control flow by panic.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn generate(&self, provider_id: &str, prompt: &str) -> Result<String>;
}

/// Candidate provider ids to try, best first: the selected provider, then
/// available chat-completion providers, then (only when the hub yields
/// nothing) the fixed common-id list.
pub fn candidate_ids(hub: &dyn ProviderHub) -> Vec<String> {
    let mut ids = Vec::new();

    if let Some(selected) = hub.selected() {
        ids.push(selected.id);
    }
    for descriptor in hub.available() {
        if descriptor.kind == ProviderKind::ChatCompletion && !ids.contains(&descriptor.id) {
            ids.push(descriptor.id);
        }
    }
    if ids.is_empty() {
        ids.extend(COMMON_PROVIDER_IDS.iter().map(|s| s.to_string()));
    }
    ids
}
