// [libs/domain/commands/src/idempotency.rs]
use sha2::{Digest, Sha256};

/// Derives an idempotency key from the SHA-256 of the payload's JSON
/// encoding when the caller supplied none (spec.md §4.9 step 1). `serde_json`
/// without the `preserve_order` feature serializes object keys in sorted
/// order, which is what makes this a stable, canonical encoding.
pub fn derive_from_payload(payload: &serde_json::Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    hex::encode(Sha256::digest(&bytes))
}

pub fn resolve(given: Option<&str>, payload: &serde_json::Value) -> String {
    match given {
        Some(key) if !key.is_empty() => key.to_string(),
        _ => derive_from_payload(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_payload_derives_the_same_key() {
        let payload = json!({"v": 1, "mode": "auto"});
        assert_eq!(derive_from_payload(&payload), derive_from_payload(&payload));
    }

    #[test]
    fn explicit_key_is_preferred_over_derivation() {
        assert_eq!(resolve(Some("k1"), &json!({"v": 1})), "k1");
    }
}
