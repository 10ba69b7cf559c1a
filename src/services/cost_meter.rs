//! Cost-aware model tier pricing and per-mission accounting (§4.6, §9 B.2).
//!
//! Pricing is keyed by the vendor-agnostic [`ModelTier`] rather than by
//! a literal model name — the core never hardcodes a vendor or model
//! name (§6 Providers).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::models::{ModelTier, TokenCounts};

/// Advertised cost per million tokens for one tier. Implementation
/// configurable, per §4.6 ("cost is computed from advertised unit
/// pricing (implementation configurable)").
#[derive(Debug, Clone, Copy)]
pub struct TierPricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Default pricing table, one entry per [`ModelTier`]. A deployment can
/// override this via `CostMeter::with_pricing`.
fn default_pricing_table() -> HashMap<ModelTier, TierPricing> {
    HashMap::from([
        (ModelTier::Fast, TierPricing { input_per_million: 0.80, output_per_million: 4.0 }),
        (ModelTier::Mid, TierPricing { input_per_million: 3.0, output_per_million: 15.0 }),
        (ModelTier::Intelligent, TierPricing { input_per_million: 15.0, output_per_million: 75.0 }),
        (ModelTier::Verifier, TierPricing { input_per_million: 3.0, output_per_million: 15.0 }),
    ])
}

/// Computes USD cost for one invocation given its tier and token counts.
pub fn estimate_cost(pricing: &HashMap<ModelTier, TierPricing>, tier: ModelTier, tokens: TokenCounts) -> f64 {
    let Some(p) = pricing.get(&tier) else { return 0.0 };
    (tokens.prompt as f64 * p.input_per_million + tokens.completion as f64 * p.output_per_million) / 1_000_000.0
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MissionCostStats {
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub call_count: u64,
}

/// Per-mission cost accumulator (§4.6 "every LLM/search invocation
/// records ... into a per-mission accumulator").
pub struct CostMeter {
    pricing: HashMap<ModelTier, TierPricing>,
    stats: RwLock<HashMap<Uuid, MissionCostStats>>,
}

impl CostMeter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { pricing: default_pricing_table(), stats: RwLock::new(HashMap::new()) })
    }

    pub fn with_pricing(pricing: HashMap<ModelTier, TierPricing>) -> Arc<Self> {
        Arc::new(Self { pricing, stats: RwLock::new(HashMap::new()) })
    }

    /// Records one invocation's cost against `mission_id`, returning the
    /// cost in USD so callers can attach it to an `ExecutionLog`.
    pub async fn record(&self, mission_id: Uuid, tier: ModelTier, tokens: TokenCounts) -> f64 {
        let cost = estimate_cost(&self.pricing, tier, tokens);
        let mut stats = self.stats.write().await;
        let entry = stats.entry(mission_id).or_default();
        entry.total_tokens += tokens.total();
        entry.total_cost_usd += cost;
        entry.call_count += 1;
        cost
    }

    pub async fn get_stats(&self, mission_id: Uuid) -> MissionCostStats {
        self.stats.read().await.get(&mission_id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_cost_and_tokens_per_mission() {
        let meter = CostMeter::new();
        let mission_id = Uuid::new_v4();
        let tokens = TokenCounts { prompt: 1_000_000, completion: 0, native: None };
        let cost = meter.record(mission_id, ModelTier::Fast, tokens).await;
        assert!((cost - 0.80).abs() < 1e-9);
        let stats = meter.get_stats(mission_id).await;
        assert_eq!(stats.total_tokens, 1_000_000);
        assert_eq!(stats.call_count, 1);
    }

    #[tokio::test]
    async fn accumulates_across_multiple_calls() {
        let meter = CostMeter::new();
        let mission_id = Uuid::new_v4();
        let tokens = TokenCounts { prompt: 100, completion: 100, native: None };
        meter.record(mission_id, ModelTier::Intelligent, tokens).await;
        meter.record(mission_id, ModelTier::Intelligent, tokens).await;
        let stats = meter.get_stats(mission_id).await;
        assert_eq!(stats.call_count, 2);
        assert_eq!(stats.total_tokens, 400);
    }

    #[tokio::test]
    async fn missions_are_accounted_independently() {
        let meter = CostMeter::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        meter.record(a, ModelTier::Fast, TokenCounts { prompt: 10, completion: 0, native: None }).await;
        let stats_b = meter.get_stats(b).await;
        assert_eq!(stats_b.call_count, 0);
        assert_eq!(meter.get_stats(a).await.call_count, 1);
    }
}
