//! iQube Core: capsule data model, trust scoring and payload sealing
//!
//! An iQube is a capsule with a public metadata layer (who made it, what it
//! holds, four quality signals) and a private payload layer that is either open
//! or sealed.
//!
//! ## Core Components
//!
//! - **Capsules**: [`Capsule`], [`CapsuleKind`] and the [`create_capsule`] factory
//! - **Scoring**: trust score, reliability and signal bands from the quality signals
//! - **Policy**: [`TierPolicy`] strategies that map sensitivity and risk to an
//!   [`EncryptionTier`]
//! - **Sealing**: AES-256-GCM tokens for the Basic tier, with PBKDF2 key derivation
//! - **Config**: weight tables, thresholds and KDF parameters from TOML and the
//!   environment
//!
//! Only the Basic tier can seal. The other tiers are recommended by policy but
//! fail with [`IqubeError::UnsupportedTier`] when used.

#![forbid(unsafe_code)]

pub mod capsule;
pub mod config;
pub mod entropy;
pub mod errors;
pub mod metadata;
pub mod payload;
pub mod policy;
pub mod scoring;
pub mod sealing;
pub mod serde_utils;
pub mod signals;

pub use capsule::{
    create_capsule, create_capsule_from_tag, AgentDescriptor, Capsule, CapsuleKind,
    CapsuleVariant, ContentDetails,
};
pub use config::{ConfigLoader, IqubeConfig, PolicyConfig};
pub use entropy::{EntropySource, OsEntropy, SeededEntropy};
pub use errors::{IqubeError, PayloadState, Rejected, Result};
pub use metadata::{Identifiability, MetadataFields, MetadataLayer, OwnerType};
pub use payload::{Entries, OpenPayload, PayloadLayer, SealedPayload, SealedRecord};
pub use policy::{
    recommend_tier, EncryptionTier, FourTierPolicy, PolicyStrategy, TierPolicy, TwoTierPolicy,
};
pub use scoring::{score_signals, trust_score, trust_score_with, ScoreWeights};
pub use sealing::{SealingKey, SealingParams};
pub use signals::{QualitySignals, Signal, SignalBand};
