//! `iqube score`

use anyhow::{Context, Result};
use clap::Args;
use iqube_core::{score_signals, IqubeConfig, QualitySignals, Signal};
use serde_json::{json, Map, Value};

/// Arguments for scoring a signal set
#[derive(Args)]
pub struct ScoreArgs {
    /// Sensitivity (0-10)
    #[arg(long)]
    pub sensitivity: f64,

    /// Verifiability (0-10)
    #[arg(long)]
    pub verifiability: f64,

    /// Accuracy (0-10)
    #[arg(long)]
    pub accuracy: f64,

    /// Risk (0-10)
    #[arg(long)]
    pub risk: f64,
}

/// Trust score under the configured weights, reliability and bands
pub fn run(args: &ScoreArgs, config: &IqubeConfig) -> Result<Value> {
    let signals = QualitySignals::new(args.sensitivity, args.verifiability, args.accuracy, args.risk)
        .context("Invalid quality signals")?;

    let mut bands = Map::new();
    for signal in Signal::ALL {
        bands.insert(
            signal.as_str().to_string(),
            serde_json::to_value(signals.band(signal))?,
        );
    }

    Ok(json!({
        "trust_score": score_signals(&config.scoring, &signals),
        "reliability": signals.reliability(),
        "bands": bands,
    }))
}
