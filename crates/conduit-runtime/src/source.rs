//! Source URL (`prefix:path`) parsing.

use conduit_types::error::{ConduitError, Result};

/// Split a source URL at its first colon into `(prefix, path)`.
pub fn split_source_url(url: &str) -> Result<(&str, &str)> {
    url.split_once(':')
        .ok_or_else(|| ConduitError::MalformedSourceUrl(url.to_string()))
}

/// Scope a bare device path to `prefix`; URLs that already carry a prefix
/// are returned unchanged.
pub fn with_default_prefix(prefix: &str, device_url: &str) -> String {
    if device_url.contains(':') {
        device_url.to_string()
    } else {
        format!("{prefix}:{device_url}")
    }
}
