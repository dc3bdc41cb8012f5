//! `iqube create`

use super::read_json;
use anyhow::{Context, Result};
use clap::Args;
use iqube_core::{create_capsule_from_tag, Entries, MetadataFields};
use serde_json::Value;
use std::path::PathBuf;

/// Arguments for building a capsule
#[derive(Args)]
pub struct CreateArgs {
    /// Variant tag: data, content or agent
    #[arg(long)]
    pub variant: String,

    /// JSON file with metadata fields
    #[arg(long)]
    pub metadata: Option<PathBuf>,

    /// JSON file with payload entries
    #[arg(long)]
    pub entries: Option<PathBuf>,
}

/// Build a capsule from the given files and print it
pub fn run(args: &CreateArgs) -> Result<Value> {
    let fields: MetadataFields = match &args.metadata {
        Some(path) => read_json(path)?,
        None => MetadataFields::default(),
    };
    let entries: Entries = match &args.entries {
        Some(path) => read_json(path)?,
        None => Entries::new(),
    };

    let capsule = create_capsule_from_tag(&args.variant, fields, entries)
        .with_context(|| format!("Failed to create '{}' capsule", args.variant))?;
    tracing::info!(
        capsule = %capsule.metadata().id(),
        variant = %capsule.variant(),
        trust = capsule.trust_score(),
        "created capsule"
    );
    Ok(serde_json::to_value(&capsule)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let metadata = dir.path().join("meta.json");
        let entries = dir.path().join("entries.json");
        std::fs::write(&metadata, r#"{"identifier":"Trial","sensitivity":8,"risk":3}"#).unwrap();
        std::fs::write(&entries, r#"{"patient":"p-17"}"#).unwrap();

        let out = run(&CreateArgs {
            variant: "agent".to_string(),
            metadata: Some(metadata),
            entries: Some(entries),
        })
        .unwrap();
        assert_eq!(out["metadata"]["identifier"], json!("Trial"));
        assert_eq!(out["kind"]["variant"], json!("agent_descriptor"));
        assert_eq!(out["payload"]["payload"], json!({"entries": {"patient": "p-17"}}));
    }

    #[test]
    fn test_unknown_variant() {
        let err = run(&CreateArgs {
            variant: "widget".to_string(),
            metadata: None,
            entries: None,
        })
        .unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported capsule variant: widget"));
    }
}
