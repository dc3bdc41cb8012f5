//! Payload sealing for the Basic tier
//!
//! Authenticated encryption of an open payload into an opaque token:
//!
//! ```text
//! version (1) || kind (1) || issued_at (8, big-endian seconds) || nonce (12) || AES-256-GCM ciphertext+tag
//! ```
//!
//! The kind byte records whether the plaintext is an entries map or a raw blob,
//! so unsealing restores the exact variant that was sealed.
//!
//! # Security
//!
//! - Version, kind and timestamp are bound as associated data, so any bit flip
//!   in the token fails authentication
//! - Nonces are drawn fresh from the entropy source for every token
//! - Keys are 32 bytes, zeroized on drop, and never logged (only a BLAKE3
//!   fingerprint is)
//! - Without a caller key, one is derived with PBKDF2-HMAC-SHA256 from a random
//!   password and salt; the caller must persist it, there is no recovery path

use crate::entropy::EntropySource;
use crate::errors::{IqubeError, Result};
use crate::payload::{Entries, OpenPayload, SealedPayload};
use crate::policy::EncryptionTier;
use crate::serde_utils::{decode_base64, encode_base64};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Key, Nonce,
};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a sealing key in bytes
pub const KEY_LEN: usize = 32;
/// Length of the AES-GCM nonce in bytes
pub const NONCE_LEN: usize = 12;
/// Leading byte of every token
pub const TOKEN_VERSION: u8 = 0x80;
/// Fewest PBKDF2 rounds accepted for generated keys
pub const MIN_KDF_ITERATIONS: u32 = 100_000;
/// Shortest salt accepted for generated keys
pub const MIN_SALT_LEN: usize = 8;
/// Longest salt accepted for generated keys
pub const MAX_SALT_LEN: usize = 64;

const TAG_LEN: usize = 16;
const AAD_LEN: usize = 1 + 1 + 8;
const HEADER_LEN: usize = AAD_LEN + NONCE_LEN;

/// Symmetric key material for the Basic tier
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealingKey([u8; KEY_LEN]);

impl SealingKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Wrap a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            IqubeError::malformed(format!(
                "key material must be {KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Parse base64 key material
    pub fn from_base64(text: &str) -> Result<Self> {
        let mut bytes = decode_base64(text)
            .map_err(|e| IqubeError::malformed(format!("key material is not base64: {e}")))?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        key
    }

    /// Render as base64 text
    pub fn to_base64(&self) -> String {
        encode_base64(&self.0)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// PBKDF2-HMAC-SHA256 over a caller password and salt
    pub fn derive_from_password(password: &[u8], salt: &[u8], iterations: u32) -> Self {
        let mut out = [0u8; KEY_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(password, salt, iterations, &mut out);
        Self(out)
    }

    /// Derive a fresh key from a random password and salt
    ///
    /// Fails with `Config` when `params` are weaker than the accepted minimum.
    pub fn generate(params: &SealingParams, entropy: &mut dyn EntropySource) -> Result<Self> {
        params.validate()?;

        let mut password = [0u8; 32];
        entropy.fill_bytes(&mut password);
        let mut password_hex = hex::encode(password);
        password.zeroize();

        let mut salt = vec![0u8; params.salt_len];
        entropy.fill_bytes(&mut salt);

        let key = Self::derive_from_password(password_hex.as_bytes(), &salt, params.kdf_iterations);
        password_hex.zeroize();
        tracing::debug!(
            iterations = params.kdf_iterations,
            key = %key.fingerprint(),
            "derived sealing key"
        );
        Ok(key)
    }

    /// Short non-secret identifier for logs
    pub fn fingerprint(&self) -> String {
        let digest = blake3::hash(&self.0);
        hex::encode(&digest.as_bytes()[..8])
    }
}

impl PartialEq for SealingKey {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SealingKey {}

impl fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SealingKey").field(&self.fingerprint()).finish()
    }
}

/// Key-derivation parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SealingParams {
    /// PBKDF2 rounds for generated keys
    pub kdf_iterations: u32,
    /// Salt length in bytes for generated keys
    pub salt_len: usize,
}

impl SealingParams {
    /// Reject round counts and salt lengths below the accepted strength
    pub fn validate(&self) -> Result<()> {
        if self.kdf_iterations < MIN_KDF_ITERATIONS {
            return Err(IqubeError::config(format!(
                "sealing.kdf_iterations = {} is below the minimum of {MIN_KDF_ITERATIONS}",
                self.kdf_iterations
            )));
        }
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&self.salt_len) {
            return Err(IqubeError::config(format!(
                "sealing.salt_len = {} must be between {MIN_SALT_LEN} and {MAX_SALT_LEN} bytes",
                self.salt_len
            )));
        }
        Ok(())
    }
}

impl Default for SealingParams {
    fn default() -> Self {
        Self {
            kdf_iterations: MIN_KDF_ITERATIONS,
            salt_len: 16,
        }
    }
}

/// Seal an open payload under `tier`
///
/// Only [`EncryptionTier::Basic`] is implemented; every other tier fails with
/// `UnsupportedTier` before any work is done. When `key` is `None` a key is
/// derived from `params` and returned on the sealed payload; weak params
/// fail with `Config`.
pub fn seal(
    payload: &OpenPayload,
    tier: EncryptionTier,
    key: Option<SealingKey>,
    params: &SealingParams,
    entropy: &mut dyn EntropySource,
) -> Result<SealedPayload> {
    if !tier.is_implemented() {
        tracing::warn!(%tier, "rejected seal under unimplemented tier");
        return Err(IqubeError::unsupported_tier(tier.as_str()));
    }

    let key = match key {
        Some(key) => key,
        None => SealingKey::generate(params, entropy)?,
    };

    let kind = BodyKind::of(payload);
    let mut plaintext = payload.to_plaintext()?;
    let issued_at = Utc::now().timestamp();
    let token = encrypt_token(&key, kind as u8, &plaintext, issued_at, entropy);
    plaintext.zeroize();
    let token = token?;

    tracing::debug!(
        %tier,
        key = %key.fingerprint(),
        token_len = token.len(),
        "sealed payload"
    );
    Ok(SealedPayload::from_parts(token, key, tier))
}

/// Unseal a sealed payload with its own key material
///
/// The header's kind byte selects the variant, so a blob always comes back as
/// the same bytes even when they happen to be valid JSON. A token whose kind
/// byte is unassigned falls back to the content: bytes that parse as an
/// entries map become [`OpenPayload::Entries`], anything else
/// [`OpenPayload::Blob`].
pub fn unseal(sealed: &SealedPayload) -> Result<OpenPayload> {
    if !sealed.tier().is_implemented() {
        return Err(IqubeError::unsupported_tier(sealed.tier().as_str()));
    }

    let opened = decrypt_token(sealed.key_material(), sealed.ciphertext())?;
    let issued_at = opened.issued_at;
    let payload = match BodyKind::from_byte(opened.kind) {
        Some(BodyKind::Entries) => {
            let entries = serde_json::from_slice::<Entries>(&opened.plaintext).map_err(|e| {
                IqubeError::malformed(format!("entries token does not hold an entries map: {e}"))
            })?;
            OpenPayload::Entries(entries)
        }
        Some(BodyKind::Blob) => OpenPayload::Blob(opened.plaintext),
        None => OpenPayload::from_plaintext(opened.plaintext),
    };
    tracing::debug!(
        key = %sealed.key_material().fingerprint(),
        kind = payload.kind(),
        issued_at,
        "unsealed payload"
    );
    Ok(payload)
}

/// Canonical bytes of an entries map (sorted keys, compact JSON)
pub fn canonical_bytes(entries: &Entries) -> Result<Vec<u8>> {
    serde_json::to_vec(entries).map_err(|e| IqubeError::serialization(e.to_string()))
}

/// Issue time recorded in a token header, if the header is present
pub fn token_issued_at(token: &[u8]) -> Option<DateTime<Utc>> {
    let ts: [u8; 8] = token.get(2..AAD_LEN)?.try_into().ok()?;
    Utc.timestamp_opt(i64::from_be_bytes(ts), 0).single()
}

/// Plaintext layout recorded in the token header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum BodyKind {
    Entries = 0x01,
    Blob = 0x02,
}

impl BodyKind {
    fn of(payload: &OpenPayload) -> Self {
        match payload {
            OpenPayload::Entries(_) => Self::Entries,
            OpenPayload::Blob(_) => Self::Blob,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Entries),
            0x02 => Some(Self::Blob),
            _ => None,
        }
    }
}

struct OpenedToken {
    plaintext: Vec<u8>,
    kind: u8,
    issued_at: i64,
}

fn cipher_for(key: &SealingKey) -> Aes256Gcm {
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()))
}

fn encrypt_token(
    key: &SealingKey,
    kind: u8,
    plaintext: &[u8],
    issued_at: i64,
    entropy: &mut dyn EntropySource,
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    entropy.fill_bytes(&mut nonce);

    let mut token = Vec::with_capacity(HEADER_LEN + plaintext.len() + TAG_LEN);
    token.push(TOKEN_VERSION);
    token.push(kind);
    token.extend_from_slice(&issued_at.to_be_bytes());
    token.extend_from_slice(&nonce);

    let ciphertext = cipher_for(key)
        .encrypt(
            Nonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &token[..AAD_LEN],
            },
        )
        .map_err(|e| IqubeError::serialization(format!("AES-GCM encryption failed: {e}")))?;

    token.extend_from_slice(&ciphertext);
    Ok(token)
}

fn decrypt_token(key: &SealingKey, token: &[u8]) -> Result<OpenedToken> {
    if token.len() < HEADER_LEN + TAG_LEN {
        return Err(IqubeError::malformed(format!(
            "token is {} bytes, shorter than the {} byte minimum",
            token.len(),
            HEADER_LEN + TAG_LEN
        )));
    }

    if token[0] != TOKEN_VERSION {
        tracing::warn!(version = token[0], "token version mismatch");
        return Err(IqubeError::decryption(format!(
            "unknown token version 0x{:02x}",
            token[0]
        )));
    }

    let (aad, rest) = token.split_at(AAD_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&aad[2..]);

    let plaintext = cipher_for(key)
        .decrypt(
            Nonce::from_slice(nonce),
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| {
            tracing::warn!(key = %key.fingerprint(), "token authentication failed");
            IqubeError::decryption("authentication failed (wrong key or tampered token)")
        })?;

    Ok(OpenedToken {
        plaintext,
        kind: aad[1],
        issued_at: i64::from_be_bytes(ts),
    })
}
