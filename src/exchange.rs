//! Federated credential exchange through the AWS CLI.
//!
//! The STS call itself belongs to the AWS CLI; this module runs
//! `aws sts assume-role-with-saml` exactly once, synchronously, and judges
//! the outcome by the shape of the JSON it prints. A response missing any of
//! the three credential fields is a failure no matter what the process exit
//! status said.

use std::io;
use std::process::Command;

use log::debug;
use serde::Deserialize;

use crate::error::AuthError;
use crate::saml::{RolePair, SamlAssertion};

/// Name of the external executable that performs the exchange.
pub const AWS_CLI: &str = "aws";

/// Temporary credentials as returned by the exchange. Ephemeral by design:
/// the bundle only ever lives in memory and in the process environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    /// Reported by STS but not surfaced beyond a log line.
    pub expiration: Option<String>,
}

/// Exchange boundary, injectable so the pipeline can be tested without
/// spawning anything.
pub trait CredentialExchanger {
    fn exchange(
        &self,
        role: &RolePair,
        assertion: &SamlAssertion,
    ) -> Result<CredentialBundle, AuthError>;
}

pub struct AwsCliExchanger;

impl AwsCliExchanger {
    /// Probes for the AWS CLI before any interactive or network step runs,
    /// so a missing dependency fails the run immediately.
    pub fn locate() -> Result<Self, AuthError> {
        Command::new(AWS_CLI)
            .arg("--version")
            .output()
            .map(|_| Self)
            .map_err(|_| AuthError::MissingDependency(AWS_CLI.to_string()))
    }
}

impl CredentialExchanger for AwsCliExchanger {
    fn exchange(
        &self,
        role: &RolePair,
        assertion: &SamlAssertion,
    ) -> Result<CredentialBundle, AuthError> {
        debug!("assuming {} via {}", role.role_arn, role.principal_arn);

        let output = Command::new(AWS_CLI)
            .args([
                "sts",
                "assume-role-with-saml",
                "--role-arn",
                &role.role_arn,
                "--principal-arn",
                &role.principal_arn,
                "--saml-assertion",
                assertion.encoded(),
                "--output",
                "json",
            ])
            .output()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => AuthError::MissingDependency(AWS_CLI.to_string()),
                _ => AuthError::ExchangeFailed(e.to_string()),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        bundle_from_response(&stdout).map_err(|err| {
            // Surface the CLI's own diagnostics when it printed any.
            let stderr = String::from_utf8_lossy(&output.stderr);
            match stderr.trim() {
                "" => err,
                detail => AuthError::ExchangeFailed(detail.to_string()),
            }
        })
    }
}

#[derive(Deserialize)]
struct ExchangeResponse {
    #[serde(rename = "Credentials")]
    credentials: Option<RawCredentials>,
}

#[derive(Deserialize, Default)]
struct RawCredentials {
    #[serde(rename = "AccessKeyId")]
    access_key_id: Option<String>,
    #[serde(rename = "SecretAccessKey")]
    secret_access_key: Option<String>,
    #[serde(rename = "SessionToken")]
    session_token: Option<String>,
    #[serde(rename = "Expiration")]
    expiration: Option<String>,
}

/// Validates the exchange response: all three credential fields must be
/// present and non-empty, or the whole exchange counts as failed.
pub fn bundle_from_response(json: &str) -> Result<CredentialBundle, AuthError> {
    let failed = |detail: &str| AuthError::ExchangeFailed(detail.to_string());

    let response: ExchangeResponse =
        serde_json::from_str(json).map_err(|_| failed("exchange response is not valid JSON"))?;
    let credentials = response
        .credentials
        .ok_or_else(|| failed("exchange response carries no Credentials object"))?;

    match (
        credentials.access_key_id,
        credentials.secret_access_key,
        credentials.session_token,
    ) {
        (Some(key), Some(secret), Some(token))
            if !key.is_empty() && !secret.is_empty() && !token.is_empty() =>
        {
            Ok(CredentialBundle {
                access_key_id: key,
                secret_access_key: secret,
                session_token: token,
                expiration: credentials.expiration,
            })
        }
        _ => Err(failed(
            "exchange response is missing AccessKeyId, SecretAccessKey or SessionToken",
        )),
    }
}
