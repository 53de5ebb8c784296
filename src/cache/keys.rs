//! Content-addressed cache keys.
//!
//! A key is `<kind>:<version>:<sha256 hex>` where the digest covers the
//! renderer kind, a JSON fingerprint of the kind-level options, and the JSON
//! encoding of the task payload, separated by NUL bytes. SHA-256 over
//! `serde_json` output is stable across processes and platforms, which keeps
//! persistent stores valid between restarts. [`KEY_VERSION`] must be bumped
//! whenever the hashed representation changes so a long-lived store never
//! serves entries produced under a different encoding.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Version segment embedded in every key.
pub(crate) const KEY_VERSION: &str = "v1";

/// Key for one render task: identical `{kind, seed, payload}` triples map to
/// the same entry no matter which renderer instance or process produced them.
pub(crate) fn task_key<P: Serialize>(kind: &str, seed: &serde_json::Value, payload: &P) -> String {
    let seed_bytes = serde_json::to_vec(seed).expect("options seed serializes to JSON");
    let payload_bytes = serde_json::to_vec(payload).expect("task payload serializes to JSON");

    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update([0u8]);
    hasher.update(&seed_bytes);
    hasher.update([0u8]);
    hasher.update(&payload_bytes);

    format!("{kind}:{KEY_VERSION}:{}", hex::encode(hasher.finalize()))
}

/// Key for a whole rendered document.
pub(crate) fn document_key(input: &str, options_fingerprint: &serde_json::Value) -> String {
    task_key("document", options_fingerprint, &input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Payload<'a> {
        code: &'a str,
        language: &'a str,
    }

    #[test]
    fn identical_payloads_share_a_key() {
        let seed = serde_json::json!({ "wrapper": ["<pre>", "</pre>"] });
        let a = task_key(
            "highlight",
            &seed,
            &Payload {
                code: "let x = 1;",
                language: "rust",
            },
        );
        let b = task_key(
            "highlight",
            &seed,
            &Payload {
                code: "let x = 1;",
                language: "rust",
            },
        );
        assert_eq!(a, b);
    }

    #[test]
    fn payload_and_kind_and_seed_all_discriminate() {
        let seed = serde_json::json!(null);
        let base = task_key(
            "highlight",
            &seed,
            &Payload {
                code: "x",
                language: "rust",
            },
        );

        let other_payload = task_key(
            "highlight",
            &seed,
            &Payload {
                code: "x",
                language: "python",
            },
        );
        let other_kind = task_key(
            "math",
            &seed,
            &Payload {
                code: "x",
                language: "rust",
            },
        );
        let other_seed = task_key(
            "highlight",
            &serde_json::json!({ "expand_tab": 2 }),
            &Payload {
                code: "x",
                language: "rust",
            },
        );

        assert_ne!(base, other_payload);
        assert_ne!(base, other_kind);
        assert_ne!(base, other_seed);
    }

    #[test]
    fn keys_carry_kind_and_version_prefix() {
        let key = document_key("# Title", &serde_json::json!({}));
        assert!(key.starts_with("document:v1:"));
        let digest = key.rsplit(':').next().unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.bytes().all(|b| b.is_ascii_hexdigit()));
    }
}
