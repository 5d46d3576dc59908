//! Content hashing used to detect no-op syncs.
//!
//! `serde_json::Value`'s default (non-`preserve_order`) map type is
//! alphabetically ordered, so re-serializing a parsed value already gives a
//! canonical byte representation - no separate key-sorting pass is needed.

use serde_json::Value;
use sha2::{Digest, Sha256};

pub fn content_hash(value: &Value) -> String {
    let canonical = serde_json::to_string(value).unwrap_or_default();
    let digest = Sha256::digest(canonical.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn identical_values_hash_identically() {
        let a = content_hash(&json!({"b": 2, "a": 1}));
        let b = content_hash(&json!({"a": 1, "b": 2}));
        assert_eq!(a, b);
    }

    #[test]
    fn different_values_hash_differently() {
        let a = content_hash(&json!({"a": 1}));
        let b = content_hash(&json!({"a": 2}));
        assert_ne!(a, b);
    }
}
