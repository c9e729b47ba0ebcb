//! Application-URI validation.

use url::Url;

use crate::error::AuthError;

/// Validates the Okta application URI and extracts the org domain.
///
/// The URI must be `https`, carry a host of one or more non-empty
/// dot-separated labels and a path of at least one non-empty segment. The
/// returned domain is the third `/`-delimited token of the URI and is what
/// the login flow authenticates against.
pub fn provider_domain(app_uri: &str) -> Result<String, AuthError> {
    let invalid = || AuthError::InvalidEndpoint(app_uri.to_string());

    let url = Url::parse(app_uri).map_err(|_| invalid())?;
    if url.scheme() != "https" {
        return Err(invalid());
    }

    let host = url.host_str().ok_or_else(invalid)?;
    if host.split('.').any(|label| label.is_empty()) {
        return Err(invalid());
    }

    let has_path = url
        .path_segments()
        .is_some_and(|mut segments| segments.any(|s| !s.is_empty()));
    if !has_path {
        return Err(invalid());
    }

    Ok(host.to_string())
}
