//! Capsules and the capsule factory
//!
//! A [`Capsule`] pairs a public [`MetadataLayer`] with a private
//! [`PayloadLayer`] and a variant-specific [`CapsuleKind`]. The set of variants
//! is closed; string tags from outside are resolved through
//! [`CapsuleVariant::from_str`].

use crate::entropy::EntropySource;
use crate::errors::{IqubeError, Result};
use crate::metadata::{MetadataFields, MetadataLayer};
use crate::payload::{Entries, OpenPayload, PayloadLayer, SealedPayload};
use crate::policy::{EncryptionTier, TierPolicy};
use crate::scoring::ScoreWeights;
use crate::sealing::{SealingKey, SealingParams};
use crate::serde_utils::base64_bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Media carried by a content capsule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentDetails {
    /// Raw content bytes
    #[serde(with = "base64_bytes")]
    pub content: Vec<u8>,
    /// MIME type
    pub content_type: String,
    /// File extension without the dot
    pub file_extension: String,
}

impl Default for ContentDetails {
    fn default() -> Self {
        Self {
            content: Vec::new(),
            content_type: "application/octet-stream".to_string(),
            file_extension: String::new(),
        }
    }
}

impl ContentDetails {
    /// Replace the content together with its type and extension
    pub fn set_content(
        &mut self,
        content: Vec<u8>,
        content_type: impl Into<String>,
        file_extension: impl Into<String>,
    ) {
        self.content = content;
        self.content_type = content_type.into();
        self.file_extension = file_extension.into();
    }
}

/// Description of an AI agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDescriptor {
    /// Agent name
    pub name: String,
    /// Agent version
    pub version: String,
    /// Free-form agent category
    pub agent_type: String,
    /// What the agent can do
    pub capabilities: Vec<String>,
    /// Natural or programming languages supported
    pub languages: Vec<String>,
    /// Frameworks the agent is built on
    pub frameworks: Vec<String>,
    /// External APIs the agent uses
    pub apis: Vec<String>,
    performance_metrics: BTreeMap<String, Value>,
}

impl Default for AgentDescriptor {
    fn default() -> Self {
        Self {
            name: "Unnamed Agent".to_string(),
            version: "0.1.0".to_string(),
            agent_type: "Generic AI Agent".to_string(),
            capabilities: Vec::new(),
            languages: Vec::new(),
            frameworks: Vec::new(),
            apis: Vec::new(),
            performance_metrics: BTreeMap::new(),
        }
    }
}

impl AgentDescriptor {
    /// Record a performance metric, replacing any previous value
    pub fn update_performance(&mut self, metric: impl Into<String>, value: Value) {
        self.performance_metrics.insert(metric.into(), value);
    }

    /// Look up a performance metric
    pub fn performance(&self, metric: &str) -> Option<&Value> {
        self.performance_metrics.get(metric)
    }
}

/// Variant-specific part of a capsule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum CapsuleKind {
    /// Structured data only
    PlainData,
    /// Multi-modal media
    Content(ContentDetails),
    /// AI agent description
    AgentDescriptor(AgentDescriptor),
}

impl CapsuleKind {
    /// Variant selector for this kind
    pub fn variant(&self) -> CapsuleVariant {
        match self {
            CapsuleKind::PlainData => CapsuleVariant::PlainData,
            CapsuleKind::Content(_) => CapsuleVariant::Content,
            CapsuleKind::AgentDescriptor(_) => CapsuleVariant::AgentDescriptor,
        }
    }
}

/// Selector for the factory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapsuleVariant {
    /// [`CapsuleKind::PlainData`]
    PlainData,
    /// [`CapsuleKind::Content`]
    Content,
    /// [`CapsuleKind::AgentDescriptor`]
    AgentDescriptor,
}

impl CapsuleVariant {
    /// All variants
    pub const ALL: [CapsuleVariant; 3] = [
        CapsuleVariant::PlainData,
        CapsuleVariant::Content,
        CapsuleVariant::AgentDescriptor,
    ];

    /// Canonical tag
    pub fn as_str(self) -> &'static str {
        match self {
            CapsuleVariant::PlainData => "plain_data",
            CapsuleVariant::Content => "content",
            CapsuleVariant::AgentDescriptor => "agent_descriptor",
        }
    }

    fn default_kind(self) -> CapsuleKind {
        match self {
            CapsuleVariant::PlainData => CapsuleKind::PlainData,
            CapsuleVariant::Content => CapsuleKind::Content(ContentDetails::default()),
            CapsuleVariant::AgentDescriptor => {
                CapsuleKind::AgentDescriptor(AgentDescriptor::default())
            }
        }
    }
}

impl fmt::Display for CapsuleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapsuleVariant {
    type Err = IqubeError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "data" | "plain_data" => Ok(CapsuleVariant::PlainData),
            "content" => Ok(CapsuleVariant::Content),
            "agent" | "agent_descriptor" => Ok(CapsuleVariant::AgentDescriptor),
            _ => Err(IqubeError::unsupported_variant(tag)),
        }
    }
}

/// Metadata, private payload and variant details
///
/// Seal and unseal take `&mut self`. A capsule shared between threads must be
/// wrapped in a lock by the caller; nothing here synchronizes internally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    metadata: MetadataLayer,
    payload: PayloadLayer,
    kind: CapsuleKind,
}

impl Capsule {
    /// Public metadata
    pub fn metadata(&self) -> &MetadataLayer {
        &self.metadata
    }

    /// Mutable metadata, for signal refreshes
    pub fn metadata_mut(&mut self) -> &mut MetadataLayer {
        &mut self.metadata
    }

    /// Payload slot
    pub fn payload(&self) -> &PayloadLayer {
        &self.payload
    }

    /// Plaintext payload for editing; fails when sealed
    pub fn open_payload_mut(&mut self) -> Result<&mut OpenPayload> {
        self.payload.open_mut()
    }

    /// Variant details
    pub fn kind(&self) -> &CapsuleKind {
        &self.kind
    }

    /// Mutable variant details
    pub fn kind_mut(&mut self) -> &mut CapsuleKind {
        &mut self.kind
    }

    /// Which variant this capsule is
    pub fn variant(&self) -> CapsuleVariant {
        self.kind.variant()
    }

    /// Trust score under the default weights
    pub fn trust_score(&self) -> f64 {
        self.metadata.trust_score()
    }

    /// Trust score under an explicit weight table
    pub fn trust_score_with(&self, weights: &ScoreWeights) -> f64 {
        self.metadata.trust_score_with(weights)
    }

    /// Tier recommended by `policy` for this capsule's signals
    pub fn recommend_tier(&self, policy: &dyn TierPolicy) -> Result<EncryptionTier> {
        let signals = self.metadata.signals();
        policy.recommend(signals.sensitivity(), signals.risk())
    }

    /// Seal the payload under `tier`
    ///
    /// Fails with `InvalidPayloadState` when already sealed; on any failure the
    /// payload is left as it was. With `key` set to `None` the derived key is
    /// available on the returned [`SealedPayload`].
    pub fn seal(
        &mut self,
        tier: EncryptionTier,
        key: Option<SealingKey>,
        params: &SealingParams,
        entropy: &mut dyn EntropySource,
    ) -> Result<&SealedPayload> {
        let id = self.metadata.id();
        let sealed = self.payload.seal(tier, key, params, entropy)?;
        tracing::debug!(capsule = %id, %tier, "sealed capsule payload");
        Ok(sealed)
    }

    /// Seal under the tier `policy` recommends
    pub fn seal_with_policy(
        &mut self,
        policy: &dyn TierPolicy,
        key: Option<SealingKey>,
        params: &SealingParams,
        entropy: &mut dyn EntropySource,
    ) -> Result<&SealedPayload> {
        let tier = self.recommend_tier(policy)?;
        tracing::debug!(policy = policy.name(), %tier, "policy recommended tier");
        self.seal(tier, key, params, entropy)
    }

    /// Unseal the payload with its own key material
    ///
    /// Fails with `InvalidPayloadState` when not sealed; on any failure the
    /// payload is left as it was.
    pub fn unseal(&mut self) -> Result<&OpenPayload> {
        let id = self.metadata.id();
        let open = self.payload.unseal()?;
        tracing::debug!(capsule = %id, "unsealed capsule payload");
        Ok(open)
    }
}

/// Build a capsule of the given variant
///
/// Missing metadata takes its defaults; supplied signals are validated. The
/// payload starts open with `entries`.
pub fn create_capsule(
    variant: CapsuleVariant,
    fields: MetadataFields,
    entries: Entries,
) -> Result<Capsule> {
    let metadata = MetadataLayer::from_fields(fields)?;
    tracing::debug!(capsule = %metadata.id(), %variant, entries = entries.len(), "created capsule");
    Ok(Capsule {
        metadata,
        payload: PayloadLayer::Open(OpenPayload::Entries(entries)),
        kind: variant.default_kind(),
    })
}

/// Build a capsule from a variant tag such as `"data"` or `"agent"`
pub fn create_capsule_from_tag(
    tag: &str,
    fields: MetadataFields,
    entries: Entries,
) -> Result<Capsule> {
    create_capsule(tag.parse()?, fields, entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SeededEntropy;
    use crate::errors::PayloadState;
    use crate::policy::{FourTierPolicy, TwoTierPolicy};
    use serde_json::json;

    fn fields(sensitivity: f64, risk: f64) -> MetadataFields {
        MetadataFields {
            sensitivity: Some(sensitivity),
            risk: Some(risk),
            ..MetadataFields::default()
        }
    }

    #[test]
    fn test_variant_tags() {
        assert_eq!("data".parse::<CapsuleVariant>().unwrap(), CapsuleVariant::PlainData);
        assert_eq!(" Agent ".parse::<CapsuleVariant>().unwrap(), CapsuleVariant::AgentDescriptor);
        for variant in CapsuleVariant::ALL {
            assert_eq!(variant.as_str().parse::<CapsuleVariant>().unwrap(), variant);
        }
        assert_eq!(
            "widget".parse::<CapsuleVariant>().unwrap_err(),
            IqubeError::unsupported_variant("widget")
        );
    }

    #[test]
    fn test_factory_defaults_per_variant() {
        let content =
            create_capsule(CapsuleVariant::Content, MetadataFields::default(), Entries::new())
                .unwrap();
        match content.kind() {
            CapsuleKind::Content(details) => {
                assert!(details.content.is_empty());
                assert_eq!(details.content_type, "application/octet-stream");
                assert_eq!(details.file_extension, "");
            }
            other => panic!("unexpected kind {other:?}"),
        }

        let agent = create_capsule_from_tag("agent", MetadataFields::default(), Entries::new())
            .unwrap();
        match agent.kind() {
            CapsuleKind::AgentDescriptor(desc) => {
                assert_eq!(desc.name, "Unnamed Agent");
                assert_eq!(desc.version, "0.1.0");
                assert_eq!(desc.agent_type, "Generic AI Agent");
                assert!(desc.capabilities.is_empty());
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(agent.payload().state(), PayloadState::Open);
    }

    #[test]
    fn test_unknown_tag_fails() {
        let err = create_capsule_from_tag("widget", MetadataFields::default(), Entries::new())
            .unwrap_err();
        assert!(matches!(err, IqubeError::UnsupportedVariant { .. }));
    }

    #[test]
    fn test_kind_helpers() {
        let mut capsule =
            create_capsule(CapsuleVariant::Content, MetadataFields::default(), Entries::new())
                .unwrap();
        if let CapsuleKind::Content(details) = capsule.kind_mut() {
            details.set_content(b"<svg/>".to_vec(), "image/svg+xml", "svg");
        }
        assert_eq!(
            capsule.kind(),
            &CapsuleKind::Content(ContentDetails {
                content: b"<svg/>".to_vec(),
                content_type: "image/svg+xml".to_string(),
                file_extension: "svg".to_string(),
            })
        );

        let mut agent = AgentDescriptor::default();
        agent.update_performance("latency_ms", json!(120));
        agent.update_performance("latency_ms", json!(95));
        assert_eq!(agent.performance("latency_ms"), Some(&json!(95)));
        assert_eq!(agent.performance("accuracy"), None);
    }

    #[test]
    fn test_recommend_tier_uses_signals() {
        let capsule =
            create_capsule(CapsuleVariant::PlainData, fields(9.0, 9.0), Entries::new()).unwrap();
        assert_eq!(
            capsule.recommend_tier(&FourTierPolicy::DEFAULT).unwrap(),
            EncryptionTier::ZeroKnowledge
        );
        assert_eq!(
            capsule.recommend_tier(&TwoTierPolicy::DEFAULT).unwrap(),
            EncryptionTier::Advanced
        );
    }

    #[test]
    fn test_seal_with_policy_rejects_unimplemented_recommendation() {
        let mut entries = Entries::new();
        entries.insert("ssn".to_string(), json!("000-00-0000"));
        let mut capsule =
            create_capsule(CapsuleVariant::PlainData, fields(9.0, 9.0), entries).unwrap();
        let before = capsule.payload().clone();

        let err = capsule
            .seal_with_policy(
                &FourTierPolicy::DEFAULT,
                None,
                &SealingParams::default(),
                &mut SeededEntropy::deterministic(),
            )
            .unwrap_err();
        assert_eq!(err, IqubeError::unsupported_tier("zero_knowledge"));
        assert_eq!(capsule.payload(), &before);
    }

    #[test]
    fn test_seal_with_policy_low_risk_is_basic() {
        let mut capsule =
            create_capsule(CapsuleVariant::PlainData, fields(2.0, 1.0), Entries::new()).unwrap();
        let sealed = capsule
            .seal_with_policy(
                &FourTierPolicy::DEFAULT,
                Some(SealingKey::from_bytes([4; 32])),
                &SealingParams::default(),
                &mut SeededEntropy::deterministic(),
            )
            .unwrap();
        assert_eq!(sealed.tier(), EncryptionTier::Basic);
        assert!(capsule.open_payload_mut().is_err());
    }

    #[test]
    fn test_capsule_json_shape() {
        let capsule =
            create_capsule(CapsuleVariant::PlainData, MetadataFields::default(), Entries::new())
                .unwrap();
        let json = serde_json::to_value(&capsule).unwrap();
        assert_eq!(json["kind"], json!({"variant": "plain_data"}));
        assert_eq!(json["payload"]["state"], json!("open"));
        assert_eq!(serde_json::from_value::<Capsule>(json).unwrap(), capsule);
    }
}
