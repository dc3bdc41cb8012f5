//! Serde helpers for byte fields
//!
//! Byte fields travel as standard base64 text so that JSON and TOML renderings
//! stay readable.
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Blob {
//!     #[serde(with = "crate::serde_utils::base64_bytes")]
//!     bytes: Vec<u8>,
//! }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as standard base64
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64, ignoring surrounding whitespace
pub fn decode_base64(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(text.trim())
}

/// Serde module for `Vec<u8>` as base64 text
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64 text
    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::encode_base64(bytes))
    }

    /// Deserialize bytes from base64 text
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::decode_base64(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "super::base64_bytes")]
        bytes: Vec<u8>,
    }

    #[test]
    fn test_bytes_as_text() {
        let h = Holder {
            bytes: vec![0, 1, 2, 250],
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"bytes":"AAEC+g=="}"#);
        assert_eq!(serde_json::from_str::<Holder>(&json).unwrap(), h);
    }

    #[test]
    fn test_rejects_bad_base64() {
        assert!(serde_json::from_str::<Holder>(r#"{"bytes":"not base64!"}"#).is_err());
    }
}
