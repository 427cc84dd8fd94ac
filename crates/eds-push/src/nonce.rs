//! Nonce derivation for discovery responses.

use std::hash::{Hash, Hasher};

use fnv::FnvHasher;

/// Derive a response nonce from the push snapshot version and a
/// per-subscription sequence number.
///
/// The prefix is a stable hash of the snapshot version, so responses from
/// the same push generation share it; the sequence makes the nonce
/// monotonic per subscription. Receivers treat the whole string as opaque.
pub(crate) fn derive(push_version: &str, sequence: u64) -> String {
    let mut hasher = FnvHasher::default();
    push_version.hash(&mut hasher);
    format!("{:016x}-{:x}", hasher.finish(), sequence)
}
