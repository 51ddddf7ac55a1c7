//! Request signing for the administrative/push API.
//!
//! A signature covers an ordered parameter map: every `key‖value` pair is
//! fed into HMAC-MD5 in ascending key order and the digest is rendered as
//! UPPERCASE hex. Both the HTTP middleware and the outbound senders that
//! sign gateway/webhook requests share this routine.

use std::collections::BTreeMap;

use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Sign a parameter map with the shared secret.
///
/// `BTreeMap` iteration order is the ascending lexicographic key order the
/// scheme requires.
pub fn sign_params(secret: &str, params: &BTreeMap<String, String>) -> String {
    let mut mac =
        HmacMd5::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    for (key, value) in params {
        mac.update(key.as_bytes());
        mac.update(value.as_bytes());
    }
    let digest = mac.finalize().into_bytes();

    hex::encode(digest).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_params() -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("app_key".to_string(), "k".to_string());
        params.insert("timestamp".to_string(), "100".to_string());
        params.insert("path".to_string(), "/p".to_string());
        params
    }

    #[test]
    fn signature_is_deterministic() {
        assert_eq!(sign_params("s", &base_params()), sign_params("s", &base_params()));
    }

    #[test]
    fn signature_is_uppercase_hex() {
        let sig = sign_params("s", &base_params());
        assert_eq!(sig.len(), 32);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig, sig.to_uppercase());
    }

    #[test]
    fn changing_any_parameter_changes_signature() {
        let base = sign_params("s", &base_params());

        let mut changed = base_params();
        changed.insert("timestamp".to_string(), "101".to_string());
        assert_ne!(base, sign_params("s", &changed));

        let mut changed = base_params();
        changed.insert("path".to_string(), "/q".to_string());
        assert_ne!(base, sign_params("s", &changed));

        let mut changed = base_params();
        changed.insert("app_key".to_string(), "k2".to_string());
        assert_ne!(base, sign_params("s", &changed));
    }

    #[test]
    fn changing_secret_changes_signature() {
        assert_ne!(sign_params("s", &base_params()), sign_params("t", &base_params()));
    }

    #[test]
    fn extra_parameter_changes_signature() {
        let base = sign_params("s", &base_params());
        let mut extended = base_params();
        extended.insert("q".to_string(), "sendmail".to_string());
        assert_ne!(base, sign_params("s", &extended));
    }
}
