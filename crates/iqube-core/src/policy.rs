//! Encryption-level policy
//!
//! Maps sensitivity and risk to a recommended protection tier. Two strategies
//! exist and neither is privileged: callers choose one through [`TierPolicy`]
//! or [`PolicyStrategy`].

use crate::errors::{IqubeError, Result};
use crate::signals::{validate_signal, Signal};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Protection tier for a payload layer
///
/// Ordered by intended protection strength. Only [`EncryptionTier::Basic`]
/// has a sealing algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EncryptionTier {
    /// Authenticated AES-256 token
    #[serde(rename = "basic_aes_256")]
    Basic,
    /// Two-tier upgrade (RSA-4096 placeholder)
    #[serde(rename = "advanced_rsa_4096")]
    Advanced,
    /// Fully homomorphic encryption placeholder
    #[serde(rename = "homomorphic")]
    Homomorphic,
    /// Multi-party computation placeholder
    #[serde(rename = "multi_party")]
    MultiParty,
    /// Zero-knowledge placeholder
    #[serde(rename = "zero_knowledge")]
    ZeroKnowledge,
}

impl EncryptionTier {
    /// Every tier, weakest first
    pub const ALL: [EncryptionTier; 5] = [
        EncryptionTier::Basic,
        EncryptionTier::Advanced,
        EncryptionTier::Homomorphic,
        EncryptionTier::MultiParty,
        EncryptionTier::ZeroKnowledge,
    ];

    /// Wire tag
    pub fn as_str(self) -> &'static str {
        match self {
            EncryptionTier::Basic => "basic_aes_256",
            EncryptionTier::Advanced => "advanced_rsa_4096",
            EncryptionTier::Homomorphic => "homomorphic",
            EncryptionTier::MultiParty => "multi_party",
            EncryptionTier::ZeroKnowledge => "zero_knowledge",
        }
    }

    /// Whether payloads can actually be sealed under this tier
    pub fn is_implemented(self) -> bool {
        self == EncryptionTier::Basic
    }
}

impl fmt::Display for EncryptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionTier {
    type Err = IqubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "basic" | "basic_aes_256" => Ok(EncryptionTier::Basic),
            "advanced" | "advanced_rsa_4096" => Ok(EncryptionTier::Advanced),
            "homomorphic" => Ok(EncryptionTier::Homomorphic),
            "multi_party" | "multiparty" => Ok(EncryptionTier::MultiParty),
            "zero_knowledge" | "zeroknowledge" => Ok(EncryptionTier::ZeroKnowledge),
            _ => Err(IqubeError::unknown_tier(s)),
        }
    }
}

/// Strategy that recommends a tier from sensitivity and risk
pub trait TierPolicy {
    /// Short name used in logs and configuration
    fn name(&self) -> &'static str;

    /// Recommend a tier; both inputs must lie in `[0, 10]`
    fn recommend(&self, sensitivity: f64, risk: f64) -> Result<EncryptionTier>;
}

/// Average-based policy with four tiers
///
/// `avg = (sensitivity + risk) / 2`; strict comparisons, so an average equal
/// to a threshold falls into the lower bracket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FourTierPolicy {
    /// Average above which `ZeroKnowledge` is recommended
    pub zero_knowledge_above: f64,
    /// Average above which `MultiParty` is recommended
    pub multi_party_above: f64,
    /// Average above which `Homomorphic` is recommended
    pub homomorphic_above: f64,
}

impl FourTierPolicy {
    /// Thresholds 8 / 6 / 4
    pub const DEFAULT: FourTierPolicy = FourTierPolicy {
        zero_knowledge_above: 8.0,
        multi_party_above: 6.0,
        homomorphic_above: 4.0,
    };

    /// Thresholds must be finite and strictly descending
    pub fn validate(&self) -> Result<()> {
        let t = [
            self.zero_knowledge_above,
            self.multi_party_above,
            self.homomorphic_above,
        ];
        if t.iter().any(|v| !v.is_finite()) {
            return Err(IqubeError::config("four-tier thresholds must be finite"));
        }
        if !(t[0] > t[1] && t[1] > t[2]) {
            return Err(IqubeError::config(format!(
                "four-tier thresholds must descend strictly: {} > {} > {}",
                t[0], t[1], t[2]
            )));
        }
        Ok(())
    }
}

impl Default for FourTierPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TierPolicy for FourTierPolicy {
    fn name(&self) -> &'static str {
        "four-tier"
    }

    fn recommend(&self, sensitivity: f64, risk: f64) -> Result<EncryptionTier> {
        let sensitivity = validate_signal(Signal::Sensitivity, sensitivity)?;
        let risk = validate_signal(Signal::Risk, risk)?;
        let average = (sensitivity + risk) / 2.0;

        let tier = if average > self.zero_knowledge_above {
            EncryptionTier::ZeroKnowledge
        } else if average > self.multi_party_above {
            EncryptionTier::MultiParty
        } else if average > self.homomorphic_above {
            EncryptionTier::Homomorphic
        } else {
            EncryptionTier::Basic
        };
        Ok(tier)
    }
}

/// Both-signals-high policy with two tiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwoTierPolicy {
    /// Sensitivity must exceed this for `Advanced`
    pub sensitivity_above: f64,
    /// Risk must exceed this for `Advanced`
    pub risk_above: f64,
}

impl TwoTierPolicy {
    /// Both thresholds at 5
    pub const DEFAULT: TwoTierPolicy = TwoTierPolicy {
        sensitivity_above: 5.0,
        risk_above: 5.0,
    };

    /// Thresholds must be finite
    pub fn validate(&self) -> Result<()> {
        if self.sensitivity_above.is_finite() && self.risk_above.is_finite() {
            Ok(())
        } else {
            Err(IqubeError::config("two-tier thresholds must be finite"))
        }
    }
}

impl Default for TwoTierPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TierPolicy for TwoTierPolicy {
    fn name(&self) -> &'static str {
        "two-tier"
    }

    fn recommend(&self, sensitivity: f64, risk: f64) -> Result<EncryptionTier> {
        let sensitivity = validate_signal(Signal::Sensitivity, sensitivity)?;
        let risk = validate_signal(Signal::Risk, risk)?;

        if sensitivity > self.sensitivity_above && risk > self.risk_above {
            Ok(EncryptionTier::Advanced)
        } else {
            Ok(EncryptionTier::Basic)
        }
    }
}

/// Named selector for the built-in policies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyStrategy {
    /// [`FourTierPolicy`]
    #[default]
    FourTier,
    /// [`TwoTierPolicy`]
    TwoTier,
}

impl FromStr for PolicyStrategy {
    type Err = IqubeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "four-tier" | "four" | "4" => Ok(PolicyStrategy::FourTier),
            "two-tier" | "two" | "2" => Ok(PolicyStrategy::TwoTier),
            other => Err(IqubeError::config(format!("unknown policy strategy: {other}"))),
        }
    }
}

impl fmt::Display for PolicyStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyStrategy::FourTier => f.write_str("four-tier"),
            PolicyStrategy::TwoTier => f.write_str("two-tier"),
        }
    }
}

/// Recommend a tier using a built-in strategy with default thresholds
pub fn recommend_tier(
    strategy: PolicyStrategy,
    sensitivity: f64,
    risk: f64,
) -> Result<EncryptionTier> {
    match strategy {
        PolicyStrategy::FourTier => FourTierPolicy::DEFAULT.recommend(sensitivity, risk),
        PolicyStrategy::TwoTier => TwoTierPolicy::DEFAULT.recommend(sensitivity, risk),
    }
}
