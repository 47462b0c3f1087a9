use std::collections::BTreeMap;

use serde_json::Value;

/// Recursively re-orders every JSON object's keys lexicographically and
/// re-serializes with no insignificant whitespace. This is the canonical
/// representation the audit hash chain is computed over — it must be
/// stable across implementations, so no `HashMap` (whose iteration order is
/// unspecified) may ever back it.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sorted: BTreeMap<String, Value> = BTreeMap::new();
            for (k, v) in map {
                sorted.insert(k.clone(), canonicalize(v));
            }
            let mut out = serde_json::Map::new();
            for (k, v) in sorted {
                out.insert(k, v);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Normalizes an opaque `before`/`after` snapshot: empty or unparseable input
/// becomes the literal empty object `{}`.
pub fn normalize_snapshot(raw: Option<&Value>) -> Value {
    match raw {
        Some(Value::Null) | None => serde_json::json!({}),
        Some(v) => canonicalize(v),
    }
}

/// Canonical, whitespace-free JSON string for a value that has already been
/// passed through `canonicalize`.
pub fn canonical_json_string(value: &Value) -> String {
    serde_json::to_string(value).expect("canonical value is always serializable")
}

/// BLAKE3 over arbitrary bytes, hex-encoded.
pub fn blake3_hex(data: &[u8]) -> String {
    hex::encode(blake3::hash(data).as_bytes())
}

/// `hash_curr = H(hash_prev ‖ canonical(event))`, the per-partition chain
/// link. `hash_prev` is either a prior `hash_curr` or the literal "GENESIS"
/// for the first event of a partition day.
pub fn chain_hash(hash_prev: &str, canonical_event_json: &str) -> String {
    let mut buf = Vec::with_capacity(hash_prev.len() + canonical_event_json.len());
    buf.extend_from_slice(hash_prev.as_bytes());
    buf.extend_from_slice(canonical_event_json.as_bytes());
    blake3_hex(&buf)
}

/// Request-hash fingerprint for idempotency replay comparison: BLAKE3 over
/// the canonical JSON of the semantic payload (account + amount + currency +
/// authorization id, or the operation-specific equivalent).
pub fn request_fingerprint(payload: &Value) -> String {
    let canon = canonicalize(payload);
    blake3_hex(canonical_json_string(&canon).as_bytes())
}

pub const GENESIS_HASH: &str = "GENESIS";

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn canonicalize_sorts_object_keys() {
        let v = json!({"b": 1, "a": 2, "c": {"z": 1, "y": 2}});
        let canon = canonicalize(&v);
        let s = canonical_json_string(&canon);
        assert_eq!(s, r#"{"a":2,"b":1,"c":{"y":2,"z":1}}"#);
    }

    #[test]
    fn normalize_snapshot_defaults_empty_object() {
        assert_eq!(normalize_snapshot(None), json!({}));
        assert_eq!(normalize_snapshot(Some(&Value::Null)), json!({}));
    }

    #[test]
    fn chain_hash_is_deterministic_and_order_sensitive() {
        let h1 = chain_hash(GENESIS_HASH, r#"{"a":1}"#);
        let h2 = chain_hash(GENESIS_HASH, r#"{"a":1}"#);
        assert_eq!(h1, h2);
        let h3 = chain_hash(&h1, r#"{"a":2}"#);
        assert_ne!(h1, h3);
    }

    #[test]
    fn request_fingerprint_ignores_key_order() {
        let p1 = json!({"account": "acct-1", "amount": 1000, "currency": "USD"});
        let p2 = json!({"currency": "USD", "amount": 1000, "account": "acct-1"});
        assert_eq!(request_fingerprint(&p1), request_fingerprint(&p2));
    }
}
