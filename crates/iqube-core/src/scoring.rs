//! Trust scoring
//!
//! `trust = Σ weight × normalized(signal)`, where sensitivity and risk are
//! inverted (`1 - x/10`) and verifiability and accuracy are scaled (`x/10`).
//! The result is rounded to two decimals and always lies in `[0, 1]`.

use crate::errors::{IqubeError, Result};
use crate::signals::{round_to, QualitySignals};
use serde::{Deserialize, Serialize};

/// Weight table for the trust score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoreWeights {
    /// Weight of inverted sensitivity
    pub sensitivity: f64,
    /// Weight of verifiability
    pub verifiability: f64,
    /// Weight of accuracy
    pub accuracy: f64,
    /// Weight of inverted risk
    pub risk: f64,
}

impl ScoreWeights {
    /// Default weights: 0.2 / 0.3 / 0.3 / 0.2
    pub const DEFAULT: ScoreWeights = ScoreWeights {
        sensitivity: 0.2,
        verifiability: 0.3,
        accuracy: 0.3,
        risk: 0.2,
    };

    /// Tolerance used when checking that weights sum to one
    pub const SUM_TOLERANCE: f64 = 1e-9;

    /// Sum of the four weights
    pub fn total(&self) -> f64 {
        self.sensitivity + self.verifiability + self.accuracy + self.risk
    }

    /// Weights must be finite, non-negative and sum to 1
    pub fn validate(&self) -> Result<()> {
        let all = [self.sensitivity, self.verifiability, self.accuracy, self.risk];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(IqubeError::config(format!(
                "score weights must be finite and non-negative: {self:?}"
            )));
        }
        if (self.total() - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(IqubeError::config(format!(
                "score weights must sum to 1.0 (got {})",
                self.total()
            )));
        }
        Ok(())
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Trust score under the default weights
pub fn trust_score(sensitivity: f64, verifiability: f64, accuracy: f64, risk: f64) -> Result<f64> {
    trust_score_with(
        &ScoreWeights::DEFAULT,
        sensitivity,
        verifiability,
        accuracy,
        risk,
    )
}

/// Trust score under an explicit weight table
pub fn trust_score_with(
    weights: &ScoreWeights,
    sensitivity: f64,
    verifiability: f64,
    accuracy: f64,
    risk: f64,
) -> Result<f64> {
    let signals = QualitySignals::new(sensitivity, verifiability, accuracy, risk)?;
    Ok(score_signals(weights, &signals))
}

/// Trust score of an already validated signal set
pub fn score_signals(weights: &ScoreWeights, signals: &QualitySignals) -> f64 {
    let terms = [
        (1.0 - signals.sensitivity() / 10.0) * weights.sensitivity,
        (signals.verifiability() / 10.0) * weights.verifiability,
        (signals.accuracy() / 10.0) * weights.accuracy,
        (1.0 - signals.risk() / 10.0) * weights.risk,
    ];
    // Fixed summation order keeps the result reproducible bit for bit
    let trust: f64 = terms.iter().sum();
    round_to(trust, 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!(ScoreWeights::DEFAULT.validate().is_ok());
    }

    #[test]
    fn test_literal_case() {
        // 0.2*0.2 + 0.3*0.9 + 0.3*0.7 + 0.2*0.7 = 0.66
        assert_eq!(trust_score(8.0, 9.0, 7.0, 3.0).unwrap(), 0.66);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(trust_score(0.0, 10.0, 10.0, 0.0).unwrap(), 1.0);
        assert_eq!(trust_score(10.0, 0.0, 0.0, 10.0).unwrap(), 0.0);
        // Defaults of a fresh capsule: nothing verified, nothing sensitive
        assert_eq!(trust_score(0.0, 0.0, 0.0, 0.0).unwrap(), 0.4);
    }

    #[test]
    fn test_repeatable() {
        let a = trust_score(3.3, 6.7, 1.1, 9.9).unwrap();
        let b = trust_score(3.3, 6.7, 1.1, 9.9).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }

    #[test]
    fn test_range_validation() {
        let err = trust_score(11.0, 5.0, 5.0, 5.0).unwrap_err();
        assert!(matches!(err, IqubeError::InvalidSignalRange { ref signal, .. } if signal == "sensitivity"));
        assert!(trust_score(5.0, 5.0, 5.0, -1.0).is_err());
    }

    #[test]
    fn test_alternate_weights() {
        let only_accuracy = ScoreWeights {
            sensitivity: 0.0,
            verifiability: 0.0,
            accuracy: 1.0,
            risk: 0.0,
        };
        assert!(only_accuracy.validate().is_ok());
        assert_eq!(
            trust_score_with(&only_accuracy, 10.0, 0.0, 4.0, 10.0).unwrap(),
            0.4
        );
    }

    #[test]
    fn test_bad_weights_rejected() {
        let lopsided = ScoreWeights {
            sensitivity: 0.5,
            ..ScoreWeights::DEFAULT
        };
        assert!(matches!(
            lopsided.validate(),
            Err(IqubeError::Config { .. })
        ));

        let negative = ScoreWeights {
            sensitivity: -0.2,
            verifiability: 0.5,
            accuracy: 0.5,
            risk: 0.2,
        };
        assert!(negative.validate().is_err());
    }
}
