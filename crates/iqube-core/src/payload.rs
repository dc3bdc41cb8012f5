//! Private payload layer
//!
//! A payload is either [`OpenPayload`] (plaintext entries or a blob) or
//! [`SealedPayload`] (ciphertext plus key material). The two are separate types
//! and move into each other through consuming `seal`/`unseal` calls, so a value
//! can never hold plaintext and ciphertext at once. [`PayloadLayer`] is the slot
//! a capsule owns and holds exactly one of them.

use crate::entropy::EntropySource;
use crate::errors::{IqubeError, PayloadState, Rejected, Result};
use crate::policy::EncryptionTier;
use crate::sealing::{self, SealingKey, SealingParams};
use crate::serde_utils::{base64_bytes, decode_base64, encode_base64};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Structured payload entries, kept sorted for canonical encoding
pub type Entries = BTreeMap<String, Value>;

/// Plaintext payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenPayload {
    /// Key/value entries
    Entries(Entries),
    /// Opaque bytes
    Blob(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl Default for OpenPayload {
    fn default() -> Self {
        OpenPayload::Entries(Entries::new())
    }
}

impl From<Entries> for OpenPayload {
    fn from(entries: Entries) -> Self {
        OpenPayload::Entries(entries)
    }
}

impl From<Vec<u8>> for OpenPayload {
    fn from(blob: Vec<u8>) -> Self {
        OpenPayload::Blob(blob)
    }
}

impl OpenPayload {
    /// Insert or replace an entry, returning the previous value
    ///
    /// A blob payload is replaced by an entries payload holding just this entry.
    pub fn add_entry(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        match self {
            OpenPayload::Entries(entries) => entries.insert(key.into(), value),
            OpenPayload::Blob(_) => {
                let mut entries = Entries::new();
                entries.insert(key.into(), value);
                *self = OpenPayload::Entries(entries);
                None
            }
        }
    }

    /// Look up an entry
    pub fn get_entry(&self, key: &str) -> Option<&Value> {
        match self {
            OpenPayload::Entries(entries) => entries.get(key),
            OpenPayload::Blob(_) => None,
        }
    }

    /// Remove an entry, returning it if present
    pub fn remove_entry(&mut self, key: &str) -> Option<Value> {
        match self {
            OpenPayload::Entries(entries) => entries.remove(key),
            OpenPayload::Blob(_) => None,
        }
    }

    /// Replace the payload with a blob
    pub fn set_blob(&mut self, blob: Vec<u8>) {
        *self = OpenPayload::Blob(blob);
    }

    /// Entries, if this is an entries payload
    pub fn entries(&self) -> Option<&Entries> {
        match self {
            OpenPayload::Entries(entries) => Some(entries),
            OpenPayload::Blob(_) => None,
        }
    }

    /// Blob bytes, if this is a blob payload
    pub fn blob(&self) -> Option<&[u8]> {
        match self {
            OpenPayload::Entries(_) => None,
            OpenPayload::Blob(blob) => Some(blob),
        }
    }

    /// `"entries"` or `"blob"`
    pub fn kind(&self) -> &'static str {
        match self {
            OpenPayload::Entries(_) => "entries",
            OpenPayload::Blob(_) => "blob",
        }
    }

    /// Whether there is nothing to protect
    pub fn is_empty(&self) -> bool {
        match self {
            OpenPayload::Entries(entries) => entries.is_empty(),
            OpenPayload::Blob(blob) => blob.is_empty(),
        }
    }

    /// Seal this payload, consuming it
    ///
    /// On failure the payload comes back unchanged inside [`Rejected`].
    pub fn seal(
        self,
        tier: EncryptionTier,
        key: Option<SealingKey>,
        params: &SealingParams,
        entropy: &mut dyn EntropySource,
    ) -> std::result::Result<SealedPayload, Rejected<OpenPayload>> {
        match sealing::seal(&self, tier, key, params, entropy) {
            Ok(sealed) => Ok(sealed),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }

    pub(crate) fn to_plaintext(&self) -> Result<Vec<u8>> {
        match self {
            OpenPayload::Entries(entries) => sealing::canonical_bytes(entries),
            OpenPayload::Blob(blob) => Ok(blob.clone()),
        }
    }

    pub(crate) fn from_plaintext(bytes: Vec<u8>) -> Self {
        match serde_json::from_slice::<Entries>(&bytes) {
            Ok(entries) => OpenPayload::Entries(entries),
            Err(_) => OpenPayload::Blob(bytes),
        }
    }
}

/// Ciphertext, key material and tier of a sealed payload
///
/// Serializes as a [`SealedRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SealedRecord", into = "SealedRecord")]
pub struct SealedPayload {
    ciphertext: Vec<u8>,
    key_material: SealingKey,
    tier: EncryptionTier,
}

impl SealedPayload {
    pub(crate) fn from_parts(ciphertext: Vec<u8>, key_material: SealingKey, tier: EncryptionTier) -> Self {
        Self {
            ciphertext,
            key_material,
            tier,
        }
    }

    /// Opaque token bytes
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Key that unseals this payload
    pub fn key_material(&self) -> &SealingKey {
        &self.key_material
    }

    /// Tier the payload was sealed under
    pub fn tier(&self) -> EncryptionTier {
        self.tier
    }

    /// Authenticated issue time from the token header
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        sealing::token_issued_at(&self.ciphertext)
    }

    /// Swap in key material held elsewhere
    pub fn with_key_material(mut self, key: SealingKey) -> Self {
        self.key_material = key;
        self
    }

    /// Wire form of this payload
    pub fn to_record(&self) -> SealedRecord {
        SealedRecord {
            ciphertext: encode_base64(&self.ciphertext),
            key_material: self.key_material.to_base64(),
            tier: self.tier,
        }
    }

    /// Unseal this payload, consuming it
    ///
    /// On failure the sealed payload comes back unchanged inside [`Rejected`].
    pub fn unseal(self) -> std::result::Result<OpenPayload, Rejected<SealedPayload>> {
        match sealing::unseal(&self) {
            Ok(open) => Ok(open),
            Err(error) => Err(Rejected::new(error, self)),
        }
    }
}

/// Wire form of a sealed payload
///
/// ```json
/// { "ciphertext": "<base64>", "key_material": "<base64>", "tier": "basic_aes_256" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SealedRecord {
    /// Base64 token
    pub ciphertext: String,
    /// Base64 32-byte key
    pub key_material: String,
    /// Tier tag
    pub tier: EncryptionTier,
}

impl TryFrom<SealedRecord> for SealedPayload {
    type Error = IqubeError;

    fn try_from(record: SealedRecord) -> Result<Self> {
        let ciphertext = decode_base64(&record.ciphertext)
            .map_err(|e| IqubeError::malformed(format!("ciphertext is not base64: {e}")))?;
        let key_material = SealingKey::from_base64(&record.key_material)?;
        Ok(SealedPayload::from_parts(ciphertext, key_material, record.tier))
    }
}

impl From<SealedPayload> for SealedRecord {
    fn from(sealed: SealedPayload) -> Self {
        sealed.to_record()
    }
}

/// The payload slot owned by a capsule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "payload", rename_all = "snake_case")]
pub enum PayloadLayer {
    /// Plaintext present
    Open(OpenPayload),
    /// Ciphertext present
    Sealed(SealedPayload),
}

impl Default for PayloadLayer {
    fn default() -> Self {
        PayloadLayer::Open(OpenPayload::default())
    }
}

impl PayloadLayer {
    /// Current state
    pub fn state(&self) -> PayloadState {
        match self {
            PayloadLayer::Open(_) => PayloadState::Open,
            PayloadLayer::Sealed(_) => PayloadState::Sealed,
        }
    }

    /// Open payload, if open
    pub fn as_open(&self) -> Option<&OpenPayload> {
        match self {
            PayloadLayer::Open(open) => Some(open),
            PayloadLayer::Sealed(_) => None,
        }
    }

    /// Sealed payload, if sealed
    pub fn as_sealed(&self) -> Option<&SealedPayload> {
        match self {
            PayloadLayer::Open(_) => None,
            PayloadLayer::Sealed(sealed) => Some(sealed),
        }
    }

    /// Mutable access to the plaintext; fails when sealed
    pub fn open_mut(&mut self) -> Result<&mut OpenPayload> {
        match self {
            PayloadLayer::Open(open) => Ok(open),
            PayloadLayer::Sealed(_) => Err(IqubeError::payload_state(
                PayloadState::Open,
                PayloadState::Sealed,
            )),
        }
    }

    /// Transition open → sealed
    ///
    /// Fails with `InvalidPayloadState` when already sealed. The layer is left
    /// untouched on any failure.
    pub fn seal(
        &mut self,
        tier: EncryptionTier,
        key: Option<SealingKey>,
        params: &SealingParams,
        entropy: &mut dyn EntropySource,
    ) -> Result<&SealedPayload> {
        let open = match self {
            PayloadLayer::Open(open) => open,
            PayloadLayer::Sealed(_) => {
                return Err(IqubeError::payload_state(
                    PayloadState::Open,
                    PayloadState::Sealed,
                ))
            }
        };
        let sealed = sealing::seal(open, tier, key, params, entropy)?;
        *self = PayloadLayer::Sealed(sealed);
        self.as_sealed()
            .ok_or_else(|| IqubeError::payload_state(PayloadState::Sealed, PayloadState::Open))
    }

    /// Transition sealed → open
    ///
    /// Fails with `InvalidPayloadState` when not sealed. The layer is left
    /// untouched on any failure.
    pub fn unseal(&mut self) -> Result<&OpenPayload> {
        let sealed = match self {
            PayloadLayer::Sealed(sealed) => sealed,
            PayloadLayer::Open(_) => {
                return Err(IqubeError::payload_state(
                    PayloadState::Sealed,
                    PayloadState::Open,
                ))
            }
        };
        let open = sealing::unseal(sealed)?;
        *self = PayloadLayer::Open(open);
        self.as_open()
            .ok_or_else(|| IqubeError::payload_state(PayloadState::Open, PayloadState::Sealed))
    }
}
