//! Runtime configuration
//!
//! Weight tables, policy thresholds and key-derivation parameters all have
//! compiled-in defaults. A TOML file and a small set of environment variables
//! can override them; see [`ConfigLoader`].
//!
//! ```toml
//! [scoring]
//! sensitivity = 0.2
//! verifiability = 0.3
//! accuracy = 0.3
//! risk = 0.2
//!
//! [policy]
//! strategy = "two-tier"
//!
//! [sealing]
//! kdf_iterations = 200000
//! ```
//!
//! Each weight or threshold table is replaced as a whole, so a file that sets
//! one field of `[scoring]` must set all four.

mod loader;
pub mod validation;

pub use loader::{ConfigLoader, ConfigSource, ENV_KDF_ITERATIONS, ENV_POLICY_STRATEGY};
pub use validation::{ConfigValidator, ValidationError, ValidationResult};

use crate::errors::Result;
use crate::policy::{FourTierPolicy, PolicyStrategy, TierPolicy, TwoTierPolicy};
use crate::scoring::ScoreWeights;
use crate::sealing::{SealingParams, MAX_SALT_LEN, MIN_KDF_ITERATIONS, MIN_SALT_LEN};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy selection and thresholds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Which strategy `active` returns
    pub strategy: PolicyStrategy,
    /// Thresholds for the four-tier strategy
    pub four_tier: FourTierPolicy,
    /// Thresholds for the two-tier strategy
    pub two_tier: TwoTierPolicy,
}

impl PolicyConfig {
    /// The configured strategy with its thresholds
    pub fn active(&self) -> &dyn TierPolicy {
        match self.strategy {
            PolicyStrategy::FourTier => &self.four_tier,
            PolicyStrategy::TwoTier => &self.two_tier,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IqubeConfig {
    /// Trust score weights
    pub scoring: ScoreWeights,
    /// Tier policy
    pub policy: PolicyConfig,
    /// Key derivation for generated keys
    pub sealing: SealingParams,
}

impl IqubeConfig {
    /// Defaults, then `path` if given, then environment overrides, then a
    /// strategy chosen on the command line
    pub fn load(path: Option<&Path>, strategy: Option<PolicyStrategy>) -> Result<Self> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = path {
            loader = loader.with_file(path)?;
        }
        loader.with_env()?.with_strategy(strategy).build()
    }

    /// Check every section, reporting the first problem
    pub fn validate(&self) -> Result<()> {
        let mut validator = ConfigValidator::new();
        validator.check("scoring", self.scoring.validate());

        let mut policy = validator.for_field("policy");
        policy
            .check("four_tier", self.policy.four_tier.validate())
            .check("two_tier", self.policy.two_tier.validate());
        validator.merge(policy);

        let mut sealing = validator.for_field("sealing");
        sealing
            .range(
                "kdf_iterations",
                self.sealing.kdf_iterations,
                Some(MIN_KDF_ITERATIONS),
                None,
            )
            .custom(
                "salt_len",
                &self.sealing.salt_len,
                |len| (MIN_SALT_LEN..=MAX_SALT_LEN).contains(len),
                "must be between 8 and 64 bytes",
            );
        validator.merge(sealing);

        validator.result()?;
        Ok(())
    }
}
