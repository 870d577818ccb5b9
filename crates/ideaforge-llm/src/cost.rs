//! USD cost estimation from token usage.
//!
//! Rates are per 1M tokens. Unknown models fall back to the configured
//! default pair instead of failing. All results are non-negative and rounded
//! to 6 decimal places.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;

use ideaforge_config::{ModelRate, PricingConfig};

use crate::types::TokenUsage;

const TOKENS_PER_UNIT: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Built-in rates for the models the pipeline uses by default.
static BUILTIN_RATES: Lazy<HashMap<&'static str, (Decimal, Decimal)>> = Lazy::new(|| {
    HashMap::from([
        ("openai/gpt-4o-mini", (Decimal::new(150, 3), Decimal::new(600, 3))),
        ("openai/gpt-4o", (Decimal::new(250, 2), Decimal::new(1000, 2))),
        (
            "anthropic/claude-3.5-sonnet",
            (Decimal::new(300, 2), Decimal::new(1500, 2)),
        ),
        (
            "anthropic/claude-3-haiku",
            (Decimal::new(25, 2), Decimal::new(125, 2)),
        ),
    ])
});

/// Estimates USD cost for one model invocation.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    default_input: Decimal,
    default_output: Decimal,
    overrides: HashMap<String, (Decimal, Decimal)>,
}

impl CostEstimator {
    /// Build an estimator from pricing config; configured model rates
    /// override the built-in table.
    #[must_use]
    pub fn new(pricing: &PricingConfig) -> Self {
        let overrides = pricing
            .models
            .iter()
            .map(|(model, ModelRate { input, output })| (model.clone(), (*input, *output)))
            .collect();
        Self {
            default_input: pricing.default_input_per_mtok,
            default_output: pricing.default_output_per_mtok,
            overrides,
        }
    }

    /// Cost in USD, rounded to 6 decimal places, never negative.
    #[must_use]
    pub fn estimate(&self, model: &str, usage: &TokenUsage) -> Decimal {
        let (input_rate, output_rate) = self.rates_for(model);
        let input_cost = Decimal::from(usage.prompt_tokens) / TOKENS_PER_UNIT * input_rate;
        let output_cost = Decimal::from(usage.completion_tokens) / TOKENS_PER_UNIT * output_rate;
        (input_cost + output_cost).max(Decimal::ZERO).round_dp(6)
    }

    fn rates_for(&self, model: &str) -> (Decimal, Decimal) {
        if let Some(rate) = self.overrides.get(model) {
            return *rate;
        }
        if let Some(rate) = BUILTIN_RATES.get(model) {
            return *rate;
        }
        (self.default_input, self.default_output)
    }
}
