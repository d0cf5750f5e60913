//! Silence Endpoint Derivation

use url::Url;

use crate::error::AlertmanagerError;

/// Path of the silence creation endpoint
pub const SILENCES_PATH: &str = "/api/v2/silences";

/// Derive the silences endpoint from an alert's `client_url`
///
/// Only scheme, host and an explicit port survive; path, query and fragment
/// of the link are dropped.
pub fn silences_endpoint(client_url: &str) -> Result<String, AlertmanagerError> {
    let invalid = |reason: String| AlertmanagerError::InvalidUrl {
        url: client_url.to_string(),
        reason,
    };

    let parsed = Url::parse(client_url).map_err(|e| invalid(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| invalid("no host".to_string()))?;

    let authority = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    Ok(format!("{}://{}{}", parsed.scheme(), authority, SILENCES_PATH))
}
