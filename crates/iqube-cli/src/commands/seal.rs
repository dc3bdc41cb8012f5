//! `iqube seal` and `iqube unseal`

use super::read_json;
use anyhow::{Context, Result};
use clap::Args;
use iqube_core::{
    EncryptionTier, EntropySource, IqubeConfig, IqubeError, OpenPayload, OsEntropy, SealedPayload,
    SealingKey,
};
use serde_json::Value;
use std::path::PathBuf;

/// Arguments for sealing a payload file
#[derive(Args)]
pub struct SealArgs {
    /// JSON file holding an open payload (`{"entries": ...}` or `{"blob": ...}`)
    #[arg(long)]
    pub input: PathBuf,

    /// Base64 32-byte key; derived and printed when omitted
    #[arg(long)]
    pub key: Option<String>,

    /// Encryption tier tag
    #[arg(long, default_value = "basic_aes_256")]
    pub tier: EncryptionTier,
}

/// Arguments for unsealing a record file
#[derive(Args)]
pub struct UnsealArgs {
    /// JSON file holding a sealed record
    #[arg(long)]
    pub input: PathBuf,
}

/// Seal the payload with OS randomness
pub fn seal(args: &SealArgs, config: &IqubeConfig) -> Result<Value> {
    seal_with(args, config, &mut OsEntropy)
}

fn seal_with(args: &SealArgs, config: &IqubeConfig, entropy: &mut dyn EntropySource) -> Result<Value> {
    let payload: OpenPayload = read_json(&args.input)?;
    let key = args
        .key
        .as_deref()
        .map(SealingKey::from_base64)
        .transpose()
        .context("Invalid --key")?;

    let sealed = payload
        .seal(args.tier, key, &config.sealing, entropy)
        .map_err(IqubeError::from)
        .with_context(|| format!("Failed to seal {}", args.input.display()))?;

    tracing::info!(tier = %sealed.tier(), key = %sealed.key_material().fingerprint(), "sealed payload");
    Ok(serde_json::to_value(sealed.to_record())?)
}

/// Unseal a record with its own key material
pub fn unseal(args: &UnsealArgs) -> Result<Value> {
    let sealed: SealedPayload = read_json(&args.input)?;
    let open = sealed
        .unseal()
        .map_err(IqubeError::from)
        .with_context(|| format!("Failed to unseal {}", args.input.display()))?;

    tracing::info!(kind = open.kind(), "unsealed payload");
    Ok(serde_json::to_value(&open)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use iqube_core::SeededEntropy;
    use serde_json::json;

    #[test]
    fn test_seal_then_unseal_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("open.json");
        std::fs::write(&input, r#"{"entries":{"email":"a@example.org"}}"#).unwrap();

        let key = SealingKey::from_bytes([8; 32]).to_base64();
        let record = seal_with(
            &SealArgs {
                input,
                key: Some(key.clone()),
                tier: EncryptionTier::Basic,
            },
            &IqubeConfig::default(),
            &mut SeededEntropy::deterministic(),
        )
        .unwrap();
        assert_eq!(record["key_material"], json!(key));
        assert_eq!(record["tier"], json!("basic_aes_256"));

        let sealed_path = dir.path().join("sealed.json");
        std::fs::write(&sealed_path, record.to_string()).unwrap();
        let open = unseal(&UnsealArgs { input: sealed_path }).unwrap();
        assert_eq!(open, json!({"entries": {"email": "a@example.org"}}));
    }

    #[test]
    fn test_unimplemented_tier_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("open.json");
        std::fs::write(&input, r#"{"blob":"AQID"}"#).unwrap();

        let err = seal_with(
            &SealArgs {
                input,
                key: None,
                tier: EncryptionTier::Homomorphic,
            },
            &IqubeConfig::default(),
            &mut SeededEntropy::deterministic(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported tier: homomorphic"));
    }

    #[test]
    fn test_bad_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("open.json");
        std::fs::write(&input, r#"{"entries":{}}"#).unwrap();

        let err = seal_with(
            &SealArgs {
                input,
                key: Some("AQID".to_string()),
                tier: EncryptionTier::Basic,
            },
            &IqubeConfig::default(),
            &mut SeededEntropy::deterministic(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Invalid --key"));
    }
}
