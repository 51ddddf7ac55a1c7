//! Content-derived job identity.
//!
//! A job name is the only datum carried through the external queue that
//! binds a delivery attempt to a specific recipient and payload:
//! `<recipient_id>_<hex(HMAC-MD5(key = recipient_id, msg = payload))>`.
//! Workers must call [`verify_data`] before acting on a name; a name that
//! fails verification is a foreign or corrupted job, not a delivery error.

use hmac::{Hmac, Mac};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

/// Derive the job name for a (recipient, payload) pair.
///
/// Pure: identical inputs always yield identical names, which is what makes
/// repeated pushes of the same payload share one identity at the queue.
pub fn generate_name(recipient_id: &str, payload: &str) -> String {
    let mut mac = HmacMd5::new_from_slice(recipient_id.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(payload.as_bytes());
    let digest = mac.finalize().into_bytes();

    format!("{}_{}", recipient_id, hex::encode(digest))
}

/// Recover the recipient id from a job name.
///
/// Splits on the LAST underscore: recipient ids may themselves contain
/// underscores, while the fixed-length hex digest never does. Returns an
/// empty string for names without a separator.
pub fn extract_recipient(name: &str) -> &str {
    match name.rfind('_') {
        Some(idx) => &name[..idx],
        None => "",
    }
}

/// Check that a job name matches the given recipient and payload.
pub fn verify_data(name: &str, recipient_id: &str, payload: &str) -> bool {
    generate_name(recipient_id, payload) == name
}
