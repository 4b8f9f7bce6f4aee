use rand::Rng;

use crate::config::ConfigStore;

/// Fabricated chat bubble the host transport renders as if `sender_name`
/// had written `content`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeMessage {
    pub sender_name: String,
    pub content: String,
}

/// Reply for a keyword-triggered greeting ("morning", "night", ...).
///
/// Returns None when the greetings feature is off or no template is
/// configured for the trigger kind.
pub fn greeting_reply(config: &ConfigStore, kind: &str, user_name: &str) -> Option<String> {
    if !config.feature_enabled("greetings") {
        return None;
    }
    let templates = config.greeting_templates(kind);
    if templates.is_empty() {
        return None;
    }

    let template = &templates[rand::rng().random_range(0..templates.len())];
    Some(template.replace("{user_name}", user_name))
}

/// Build the impersonation payload; None when the feature is off.
pub fn impersonate(config: &ConfigStore, target_name: &str, content: &str) -> Option<FakeMessage> {
    if !config.feature_enabled("impersonate") {
        return None;
    }
    Some(FakeMessage {
        sender_name: target_name.to_string(),
        content: content.to_string(),
    })
}
