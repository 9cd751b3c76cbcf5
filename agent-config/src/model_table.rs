//! The model registry the router looks labels up in (spec §4.5, §9: "the
//! router never hard-codes provider names in logic — it looks them up by
//! label").

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The four router-facing labels from spec §4.5's routing table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ModelLabel {
    SmallFast,
    MidTier,
    TopTier,
    SmallCheapConversational,
}

impl ModelLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelLabel::SmallFast => "small_fast",
            ModelLabel::MidTier => "mid_tier",
            ModelLabel::TopTier => "top_tier",
            ModelLabel::SmallCheapConversational => "small_cheap_conversational",
        }
    }
}

/// A concrete model a label resolves to, plus its per-token cost (spec §3
/// `ModelDecision`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelEntry {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub input_cost_per_token: f64,
    pub output_cost_per_token: f64,
}

/// Label → concrete model mapping, loaded once at startup.
#[derive(Debug, Clone)]
pub struct ModelTable {
    entries: HashMap<ModelLabel, ModelEntry>,
}

impl ModelTable {
    pub fn get(&self, label: ModelLabel) -> Option<&ModelEntry> {
        self.entries.get(&label)
    }

    /// The default table: one fast/cheap OpenAI-style model for every label
    /// a deployment hasn't explicitly overridden. Mirrors the single
    /// `gpt-3.5-turbo` default the teacher's `OpenAILlmClient::new` ships
    /// with, spread across the four router labels with distinct cost/size
    /// tiers.
    pub fn with_defaults() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            ModelLabel::SmallFast,
            ModelEntry {
                provider: "openai".into(),
                model: "gpt-4o-mini".into(),
                max_tokens: 1024,
                temperature: 0.3,
                input_cost_per_token: 0.00000015,
                output_cost_per_token: 0.0000006,
            },
        );
        entries.insert(
            ModelLabel::MidTier,
            ModelEntry {
                provider: "openai".into(),
                model: "gpt-4o".into(),
                max_tokens: 2048,
                temperature: 0.4,
                input_cost_per_token: 0.0000025,
                output_cost_per_token: 0.00001,
            },
        );
        entries.insert(
            ModelLabel::TopTier,
            ModelEntry {
                provider: "openai".into(),
                model: "gpt-4.1".into(),
                max_tokens: 4096,
                temperature: 0.5,
                input_cost_per_token: 0.000005,
                output_cost_per_token: 0.000015,
            },
        );
        entries.insert(
            ModelLabel::SmallCheapConversational,
            ModelEntry {
                provider: "openai".into(),
                model: "gpt-4o-mini".into(),
                max_tokens: 512,
                temperature: 0.7,
                input_cost_per_token: 0.00000015,
                output_cost_per_token: 0.0000006,
            },
        );
        Self { entries }
    }

    /// Overrides a single label's entry (used when `preferred_model` in
    /// user preferences or config is compatible with the intent).
    pub fn with_override(mut self, label: ModelLabel, entry: ModelEntry) -> Self {
        self.entries.insert(label, entry);
        self
    }
}

impl Default for ModelTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_label_resolves_in_default_table() {
        let table = ModelTable::with_defaults();
        for label in [
            ModelLabel::SmallFast,
            ModelLabel::MidTier,
            ModelLabel::TopTier,
            ModelLabel::SmallCheapConversational,
        ] {
            assert!(table.get(label).is_some(), "missing entry for {label:?}");
        }
    }

    #[test]
    fn override_replaces_only_targeted_label() {
        let table = ModelTable::with_defaults().with_override(
            ModelLabel::SmallFast,
            ModelEntry {
                provider: "openai".into(),
                model: "custom-small".into(),
                max_tokens: 256,
                temperature: 0.1,
                input_cost_per_token: 0.0,
                output_cost_per_token: 0.0,
            },
        );
        assert_eq!(table.get(ModelLabel::SmallFast).unwrap().model, "custom-small");
        assert_eq!(table.get(ModelLabel::MidTier).unwrap().model, "gpt-4o");
    }
}
