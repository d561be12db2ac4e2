//! Per-model cost lookup table.
//!
//! Returns (input_cost_per_token, output_cost_per_token) as Decimal pairs.
//! Ollama and other local models return zero cost.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Look up known per-token costs for a model by its identifier.
///
/// Returns `Some((input_cost, output_cost))` for known models, `None` otherwise.
pub fn model_cost(model_id: &str) -> Option<(Decimal, Decimal)> {
    // Normalize: strip provider prefixes (e.g., "openai/gpt-4o" -> "gpt-4o")
    let id = model_id
        .rsplit_once('/')
        .map(|(_, name)| name)
        .unwrap_or(model_id);

    match id {
        // Groq-hosted models -- prices per token (USD)
        "llama-3.3-70b-versatile" => Some((dec!(0.00000059), dec!(0.00000079))),
        "llama-3.1-8b-instant" => Some((dec!(0.00000005), dec!(0.00000008))),
        "gemma2-9b-it" => Some((dec!(0.0000002), dec!(0.0000002))),

        // OpenAI models
        "gpt-4o" | "gpt-4o-2024-11-20" | "gpt-4o-2024-08-06" => {
            Some((dec!(0.0000025), dec!(0.00001)))
        }
        "gpt-4o-mini" | "gpt-4o-mini-2024-07-18" => Some((dec!(0.00000015), dec!(0.0000006))),

        _ if is_local_model(id) => Some((Decimal::ZERO, Decimal::ZERO)),

        _ => None,
    }
}

/// Default cost for unknown models.
pub fn default_cost() -> (Decimal, Decimal) {
    (dec!(0.000001), dec!(0.000003))
}

/// Heuristic: model ids without a hosted-family prefix are served locally.
fn is_local_model(id: &str) -> bool {
    let lower = id.to_lowercase();
    ["llama3", "mistral", "phi", "qwen", "gemma:", "deepseek"]
        .iter()
        .any(|p| lower.starts_with(p))
}
