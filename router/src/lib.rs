//! # router
//!
//! The model router (spec §2 item 6, §4.5): a pure function mapping
//! `(intent, complexity, budget_mode)` to a label from the spec's routing
//! table, resolved against a [`ModelTable`] into a concrete [`ModelDecision`].
//! Grounded in the teacher's "never hard-code provider names in logic, look
//! them up by label" idiom (`agent-config::model_table`, itself grounded in
//! `llm-client::config::EnvLlmConfig`'s load-once-hand-out-immutable-struct
//! pattern).

use agent_config::{ModelLabel, ModelTable};
use agent_core::{Complexity, Intent, ModelDecision};

/// Resolves the routing table label for `(intent, complexity, budget_mode)`
/// per spec §4.5. Budget mode always wins except for `CHITCHAT`, which is
/// already the cheapest label regardless.
fn label_for(intent: Intent, complexity: Complexity, budget_mode: bool) -> ModelLabel {
    if budget_mode && !matches!(intent, Intent::Chitchat) {
        return ModelLabel::SmallFast;
    }

    match (intent, complexity) {
        (Intent::Chitchat, _) => ModelLabel::SmallCheapConversational,
        (Intent::Search, Complexity::Low | Complexity::Medium) => ModelLabel::SmallFast,
        (Intent::Search, Complexity::High) => ModelLabel::MidTier,
        (Intent::Recommend, Complexity::Low) => ModelLabel::SmallFast,
        (Intent::Recommend, Complexity::Medium | Complexity::High) => ModelLabel::MidTier,
        (Intent::Plan, Complexity::Low | Complexity::Medium) => ModelLabel::MidTier,
        (Intent::Plan, Complexity::High) => ModelLabel::TopTier,
    }
}

/// Routes an intent decision to a concrete model (spec §4.5). `preferred_model`
/// is the user's or config's override (spec §6 `preferred_model`): when set
/// and present in `table` under the label the rubric would have chosen
/// anyway, it is used as the model name but keeps that label's cost/size
/// envelope (an override picks which concrete model serves the label, not a
/// different label).
pub fn route(
    intent: Intent,
    complexity: Complexity,
    budget_mode: bool,
    preferred_model: Option<&str>,
    table: &ModelTable,
) -> Option<ModelDecision> {
    let label = label_for(intent, complexity, budget_mode);
    let entry = table.get(label)?;

    let model = match preferred_model {
        Some(name) if !budget_mode => name.to_string(),
        _ => entry.model.clone(),
    };

    Some(ModelDecision {
        provider: entry.provider.clone(),
        model,
        max_tokens: entry.max_tokens,
        temperature: entry.temperature,
        input_cost_per_token: entry.input_cost_per_token,
        output_cost_per_token: entry.output_cost_per_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ModelTable {
        ModelTable::with_defaults()
    }

    #[test]
    fn every_combination_resolves_to_a_configured_model() {
        let table = table();
        for intent in [Intent::Search, Intent::Recommend, Intent::Plan, Intent::Chitchat] {
            for complexity in [Complexity::Low, Complexity::Medium, Complexity::High] {
                for budget_mode in [false, true] {
                    let decision = route(intent, complexity, budget_mode, None, &table);
                    assert!(
                        decision.is_some(),
                        "no decision for {intent:?}/{complexity:?}/budget={budget_mode}"
                    );
                }
            }
        }
    }

    #[test]
    fn search_low_is_small_fast() {
        let decision = route(Intent::Search, Complexity::Low, false, None, &table()).unwrap();
        assert_eq!(decision.model, table().get(ModelLabel::SmallFast).unwrap().model);
    }

    #[test]
    fn search_high_is_mid_tier_unless_budget_mode() {
        let plain = route(Intent::Search, Complexity::High, false, None, &table()).unwrap();
        assert_eq!(plain.model, table().get(ModelLabel::MidTier).unwrap().model);

        let budget = route(Intent::Search, Complexity::High, true, None, &table()).unwrap();
        assert_eq!(budget.model, table().get(ModelLabel::SmallFast).unwrap().model);
    }

    #[test]
    fn plan_high_is_top_tier_unless_budget_mode() {
        let plain = route(Intent::Plan, Complexity::High, false, None, &table()).unwrap();
        assert_eq!(plain.model, table().get(ModelLabel::TopTier).unwrap().model);

        let budget = route(Intent::Plan, Complexity::High, true, None, &table()).unwrap();
        assert_eq!(budget.model, table().get(ModelLabel::SmallFast).unwrap().model);
    }

    #[test]
    fn chitchat_is_always_small_cheap_conversational() {
        for budget_mode in [false, true] {
            let decision =
                route(Intent::Chitchat, Complexity::High, budget_mode, None, &table()).unwrap();
            assert_eq!(
                decision.model,
                table().get(ModelLabel::SmallCheapConversational).unwrap().model
            );
        }
    }

    #[test]
    fn preferred_model_overrides_label_model_but_not_cost_envelope() {
        let table = table();
        let decision = route(
            Intent::Search,
            Complexity::Low,
            false,
            Some("custom-model"),
            &table,
        )
        .unwrap();
        let envelope = table.get(ModelLabel::SmallFast).unwrap();
        assert_eq!(decision.model, "custom-model");
        assert_eq!(decision.max_tokens, envelope.max_tokens);
    }

    #[test]
    fn budget_mode_ignores_preferred_model_override() {
        let table = table();
        let decision = route(
            Intent::Plan,
            Complexity::High,
            true,
            Some("custom-model"),
            &table,
        )
        .unwrap();
        assert_eq!(decision.model, table.get(ModelLabel::SmallFast).unwrap().model);
    }
}
