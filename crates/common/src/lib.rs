mod error;
mod report;

pub use error::Error;
pub use report::ErrorReport;
pub type Result<T> = std::result::Result<T, Error>;

/// Generate a short random identifier without pulling in `rand`.
///
/// Used for ICMP identifiers and per-run file names; no cryptographic
/// guarantees.
pub fn random_u64() -> u64 {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u64(nanos);
    hasher.finish()
}
