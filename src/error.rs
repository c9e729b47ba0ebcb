//! Failure taxonomy for the credential pipeline.
//!
//! Every variant is terminal for the invocation: there is no retry anywhere in
//! the core, and the process environment is only touched after a fully
//! successful exchange.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// A required external executable could not be found on PATH.
    #[error("required command `{0}` was not found on PATH")]
    MissingDependency(String),

    /// No reachable configuration file defines the requested profile.
    #[error("profile `{0}` was not found in any profiles file")]
    ProfileNotFound(String),

    /// The application URI does not match the accepted structural pattern.
    #[error("invalid application URI `{0}`: expected https://<okta-domain>/<app-path>")]
    InvalidEndpoint(String),

    /// Okta refused the login or the MFA verification.
    #[error("could not establish an Okta session: {0}")]
    SessionAcquisitionFailed(String),

    /// The app page did not yield a SAML assertion.
    #[error("could not obtain a SAML assertion: {0}")]
    AssertionAcquisitionFailed(String),

    /// The assertion decoded, but its content is not what we expect.
    #[error("malformed SAML assertion: {0}")]
    MalformedAssertion(String),

    /// The assertion parsed cleanly but carries no role attribute values.
    #[error("the SAML assertion grants no AWS roles")]
    NoRolesFound,

    /// The interactive role choice was out of range or not a number.
    #[error("invalid selection `{input}`: expected a number between 1 and {max}")]
    InvalidSelection { input: String, max: usize },

    /// The STS exchange did not return a complete credential set.
    #[error("credential exchange failed: {0}")]
    ExchangeFailed(String),
}
