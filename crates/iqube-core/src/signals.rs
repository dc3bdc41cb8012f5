//! Quality signals carried by the metadata layer
//!
//! Four numbers in `[0, 10]` supplied by an external verification service.
//! Sensitivity and risk read "lower is better"; verifiability and accuracy read
//! "higher is better".

use crate::errors::{IqubeError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of every quality signal
pub const SIGNAL_MIN: f64 = 0.0;
/// Upper bound of every quality signal
pub const SIGNAL_MAX: f64 = 10.0;

/// Names the four quality signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// How sensitive the payload is
    Sensitivity,
    /// How well the payload can be verified
    Verifiability,
    /// How accurate the payload is believed to be
    Accuracy,
    /// How risky exposure of the payload would be
    Risk,
}

impl Signal {
    /// All signals in scoring order
    pub const ALL: [Signal; 4] = [
        Signal::Sensitivity,
        Signal::Verifiability,
        Signal::Accuracy,
        Signal::Risk,
    ];

    /// Wire name of the signal
    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Sensitivity => "sensitivity",
            Signal::Verifiability => "verifiability",
            Signal::Accuracy => "accuracy",
            Signal::Risk => "risk",
        }
    }

    /// Whether a higher value of this signal means more trust
    pub fn higher_is_better(self) -> bool {
        matches!(self, Signal::Verifiability | Signal::Accuracy)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that `value` is a finite number in `[0, 10]`
pub fn validate_signal(signal: Signal, value: f64) -> Result<f64> {
    if value.is_finite() && (SIGNAL_MIN..=SIGNAL_MAX).contains(&value) {
        Ok(value)
    } else {
        Err(IqubeError::invalid_signal(signal.as_str(), value))
    }
}

/// The four quality signals of a capsule
///
/// Fields are private so that every instance has passed range validation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawSignals", into = "RawSignals")]
pub struct QualitySignals {
    sensitivity: f64,
    verifiability: f64,
    accuracy: f64,
    risk: f64,
}

impl QualitySignals {
    /// Build a validated signal set
    pub fn new(sensitivity: f64, verifiability: f64, accuracy: f64, risk: f64) -> Result<Self> {
        Ok(Self {
            sensitivity: validate_signal(Signal::Sensitivity, sensitivity)?,
            verifiability: validate_signal(Signal::Verifiability, verifiability)?,
            accuracy: validate_signal(Signal::Accuracy, accuracy)?,
            risk: validate_signal(Signal::Risk, risk)?,
        })
    }

    /// Sensitivity signal
    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    /// Verifiability signal
    pub fn verifiability(&self) -> f64 {
        self.verifiability
    }

    /// Accuracy signal
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Risk signal
    pub fn risk(&self) -> f64 {
        self.risk
    }

    /// Value of a signal by name
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Sensitivity => self.sensitivity,
            Signal::Verifiability => self.verifiability,
            Signal::Accuracy => self.accuracy,
            Signal::Risk => self.risk,
        }
    }

    /// Replace one signal; the set is unchanged on error
    pub fn set(&mut self, signal: Signal, value: f64) -> Result<()> {
        let value = validate_signal(signal, value)?;
        match signal {
            Signal::Sensitivity => self.sensitivity = value,
            Signal::Verifiability => self.verifiability = value,
            Signal::Accuracy => self.accuracy = value,
            Signal::Risk => self.risk = value,
        }
        Ok(())
    }

    /// Reliability on the signal scale: 60% accuracy, 40% verifiability, one decimal
    pub fn reliability(&self) -> f64 {
        round_to(self.accuracy * 0.6 + self.verifiability * 0.4, 1)
    }

    /// Display band of one signal
    pub fn band(&self, signal: Signal) -> SignalBand {
        SignalBand::classify(signal, self.get(signal))
    }
}

#[derive(Serialize, Deserialize)]
struct RawSignals {
    #[serde(default)]
    sensitivity: f64,
    #[serde(default)]
    verifiability: f64,
    #[serde(default)]
    accuracy: f64,
    #[serde(default)]
    risk: f64,
}

impl TryFrom<RawSignals> for QualitySignals {
    type Error = IqubeError;

    fn try_from(raw: RawSignals) -> Result<Self> {
        QualitySignals::new(raw.sensitivity, raw.verifiability, raw.accuracy, raw.risk)
    }
}

impl From<QualitySignals> for RawSignals {
    fn from(signals: QualitySignals) -> Self {
        RawSignals {
            sensitivity: signals.sensitivity,
            verifiability: signals.verifiability,
            accuracy: signals.accuracy,
            risk: signals.risk,
        }
    }
}

/// Coarse reading of a single signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalBand {
    /// Good for trust
    Favorable,
    /// Middle of the range
    Caution,
    /// Bad for trust
    Critical,
}

impl SignalBand {
    /// Classify a signal value.
    ///
    /// Sensitivity/risk: `<= 4` favorable, `<= 7` caution, else critical.
    /// Verifiability/accuracy: `<= 3` critical, `<= 6` caution, else favorable.
    pub fn classify(signal: Signal, value: f64) -> Self {
        let v = value.clamp(SIGNAL_MIN, SIGNAL_MAX);
        if signal.higher_is_better() {
            if v <= 3.0 {
                SignalBand::Critical
            } else if v <= 6.0 {
                SignalBand::Caution
            } else {
                SignalBand::Favorable
            }
        } else if v <= 4.0 {
            SignalBand::Favorable
        } else if v <= 7.0 {
            SignalBand::Caution
        } else {
            SignalBand::Critical
        }
    }
}

/// Round to `places` decimals using the exact decimal expansion of `value`
pub(crate) fn round_to(value: f64, places: usize) -> f64 {
    format!("{value:.places$}").parse().unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_accepts_bounds() {
        let s = QualitySignals::new(0.0, 10.0, 5.5, 10.0).unwrap();
        assert_eq!(s.verifiability(), 10.0);
        assert_eq!(s.get(Signal::Accuracy), 5.5);
    }

    #[test]
    fn test_new_rejects_out_of_range() {
        let err = QualitySignals::new(11.0, 1.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err, IqubeError::invalid_signal("sensitivity", 11.0));

        let err = QualitySignals::new(1.0, 1.0, 1.0, -0.5).unwrap_err();
        assert_eq!(err, IqubeError::invalid_signal("risk", -0.5));
    }

    #[test]
    fn test_new_rejects_nan() {
        assert!(QualitySignals::new(1.0, f64::NAN, 1.0, 1.0).is_err());
        assert!(QualitySignals::new(1.0, 1.0, f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_set_leaves_value_on_error() {
        let mut s = QualitySignals::new(2.0, 2.0, 2.0, 2.0).unwrap();
        assert!(s.set(Signal::Risk, 12.0).is_err());
        assert_eq!(s.risk(), 2.0);
        s.set(Signal::Risk, 9.0).unwrap();
        assert_eq!(s.risk(), 9.0);
    }

    #[test]
    fn test_reliability() {
        let s = QualitySignals::new(0.0, 9.0, 7.0, 0.0).unwrap();
        // 7 * 0.6 + 9 * 0.4 = 7.8
        assert_eq!(s.reliability(), 7.8);
    }

    #[test]
    fn test_bands() {
        assert_eq!(SignalBand::classify(Signal::Risk, 4.0), SignalBand::Favorable);
        assert_eq!(SignalBand::classify(Signal::Risk, 7.0), SignalBand::Caution);
        assert_eq!(SignalBand::classify(Signal::Risk, 7.5), SignalBand::Critical);
        assert_eq!(SignalBand::classify(Signal::Accuracy, 3.0), SignalBand::Critical);
        assert_eq!(SignalBand::classify(Signal::Accuracy, 6.0), SignalBand::Caution);
        assert_eq!(SignalBand::classify(Signal::Accuracy, 6.1), SignalBand::Favorable);
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: QualitySignals =
            serde_json::from_str(r#"{"sensitivity": 3, "risk": 4}"#).unwrap();
        assert_eq!(ok.sensitivity(), 3.0);
        assert_eq!(ok.accuracy(), 0.0);

        let bad = serde_json::from_str::<QualitySignals>(r#"{"accuracy": 42}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(0.66000000000000003, 2), 0.66);
        assert_eq!(round_to(7.8000000000000007, 1), 7.8);
    }
}
