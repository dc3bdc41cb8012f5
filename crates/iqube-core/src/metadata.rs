//! Public metadata layer of a capsule
//!
//! Descriptive fields are fixed once the layer is built. Quality signals can be
//! refreshed through [`MetadataLayer::set_signal`], which validates before it
//! writes. Trust and reliability are derived on demand and never stored.

use crate::errors::Result;
use crate::scoring::{score_signals, ScoreWeights};
use crate::signals::{QualitySignals, Signal, SignalBand};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of party that owns a capsule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerType {
    /// An individual
    #[default]
    Person,
    /// A company or group
    Organization,
    /// A device or other non-human owner
    Thing,
}

/// How easily the owner can be identified from the capsule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identifiability {
    /// No link to the owner
    Anonymous,
    /// Pseudonymous
    #[default]
    SemiAnonymous,
    /// Owner is named
    Identifiable,
    /// Owner can be inferred
    SemiIdentifiable,
}

/// Caller-supplied metadata; anything left out takes its default
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataFields {
    /// Human-facing name
    pub identifier: Option<String>,
    /// Who created the capsule
    pub creator: Option<String>,
    /// Owner kind
    pub owner_type: Option<OwnerType>,
    /// Free-form content label
    pub content_type: Option<String>,
    /// Owner identifiability
    #[serde(alias = "owner_identifiability")]
    pub identifiability: Option<Identifiability>,
    /// Sensitivity signal
    #[serde(alias = "sensitivity_score")]
    pub sensitivity: Option<f64>,
    /// Verifiability signal
    #[serde(alias = "verifiability_score")]
    pub verifiability: Option<f64>,
    /// Accuracy signal
    #[serde(alias = "accuracy_score")]
    pub accuracy: Option<f64>,
    /// Risk signal
    #[serde(alias = "risk_score")]
    pub risk: Option<f64>,
}

/// Public, verifiable metadata of a capsule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataLayer {
    id: Uuid,
    identifier: String,
    creator: String,
    owner_type: OwnerType,
    content_type: String,
    identifiability: Identifiability,
    issued_at: DateTime<Utc>,
    signals: QualitySignals,
}

impl MetadataLayer {
    /// Default identifier
    pub const DEFAULT_IDENTIFIER: &'static str = "Unnamed";
    /// Default creator
    pub const DEFAULT_CREATOR: &'static str = "Unknown";
    /// Default content label
    pub const DEFAULT_CONTENT_TYPE: &'static str = "Other";

    /// Build a layer from caller fields, validating every supplied signal
    pub fn from_fields(fields: MetadataFields) -> Result<Self> {
        let signals = QualitySignals::new(
            fields.sensitivity.unwrap_or_default(),
            fields.verifiability.unwrap_or_default(),
            fields.accuracy.unwrap_or_default(),
            fields.risk.unwrap_or_default(),
        )?;

        Ok(Self {
            id: Uuid::new_v4(),
            identifier: fields
                .identifier
                .unwrap_or_else(|| Self::DEFAULT_IDENTIFIER.to_string()),
            creator: fields
                .creator
                .unwrap_or_else(|| Self::DEFAULT_CREATOR.to_string()),
            owner_type: fields.owner_type.unwrap_or_default(),
            content_type: fields
                .content_type
                .unwrap_or_else(|| Self::DEFAULT_CONTENT_TYPE.to_string()),
            identifiability: fields.identifiability.unwrap_or_default(),
            issued_at: Utc::now(),
            signals,
        })
    }

    /// Unique id assigned at creation
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Human-facing name
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Creator
    pub fn creator(&self) -> &str {
        &self.creator
    }

    /// Owner kind
    pub fn owner_type(&self) -> OwnerType {
        self.owner_type
    }

    /// Content label
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Owner identifiability
    pub fn identifiability(&self) -> Identifiability {
        self.identifiability
    }

    /// Creation time
    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Current quality signals
    pub fn signals(&self) -> &QualitySignals {
        &self.signals
    }

    /// Replace one signal after validating it
    pub fn set_signal(&mut self, signal: Signal, value: f64) -> Result<()> {
        self.signals.set(signal, value)?;
        tracing::debug!(capsule = %self.id, %signal, value, "updated signal");
        Ok(())
    }

    /// Trust score under the default weights
    pub fn trust_score(&self) -> f64 {
        self.trust_score_with(&ScoreWeights::DEFAULT)
    }

    /// Trust score under an explicit weight table
    pub fn trust_score_with(&self, weights: &ScoreWeights) -> f64 {
        score_signals(weights, &self.signals)
    }

    /// Reliability on the signal scale
    pub fn reliability(&self) -> f64 {
        self.signals.reliability()
    }

    /// Display band of one signal
    pub fn band(&self, signal: Signal) -> SignalBand {
        self.signals.band(signal)
    }
}
