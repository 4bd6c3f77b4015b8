//! Key Codec Module
//!
//! Builds fully-qualified remote-store keys from logical keys and the
//! configured namespace prefix.

use crate::cache::MAX_KEY_LENGTH;
use crate::error::{StoreError, StoreResult};

// == Qualify ==
/// Prepends the namespace prefix to a logical key.
pub fn qualify(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

// == Scan Pattern ==
/// Builds the glob used for bulk invalidation.
///
/// With no pattern, every key under the prefix matches.
pub fn scan_pattern(prefix: &str, pattern: Option<&str>) -> String {
    match pattern {
        Some(p) => format!("{}{}", prefix, p),
        None => format!("{}*", prefix),
    }
}

// == Validate ==
/// Rejects keys the remote store should never see.
///
/// Empty and oversized keys are the one category of caller mistake the
/// store layer fails hard on; everything operational fails soft.
pub fn validate(key: &str) -> StoreResult<()> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(StoreError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}
