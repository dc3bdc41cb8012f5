//! `iqube recommend`

use anyhow::{Context, Result};
use clap::Args;
use iqube_core::{IqubeConfig, PolicyStrategy};
use serde_json::{json, Value};

/// Arguments for a tier recommendation
#[derive(Args)]
pub struct RecommendArgs {
    /// Sensitivity (0-10)
    #[arg(long)]
    pub sensitivity: f64,

    /// Risk (0-10)
    #[arg(long)]
    pub risk: f64,

    /// Policy strategy (four-tier or two-tier); layered over the configured one
    #[arg(long)]
    pub policy: Option<PolicyStrategy>,
}

/// Recommend a tier with the configured strategy and thresholds
///
/// `--policy` reaches this through the config loader's command-line layer.
pub fn run(args: &RecommendArgs, config: &IqubeConfig) -> Result<Value> {
    let active = config.policy.active();
    let tier = active
        .recommend(args.sensitivity, args.risk)
        .context("Recommendation failed")?;

    tracing::info!(policy = active.name(), %tier, "recommended tier");
    Ok(json!({
        "policy": active.name(),
        "tier": tier,
        "implemented": tier.is_implemented(),
    }))
}
