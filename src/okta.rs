//! Okta collaborator boundary.
//!
//! Two calls make up the boundary: establishing a session token from the org
//! domain plus a credential and an MFA selector, then trading the session for
//! the base64 SAML assertion of the target application. The login kept here
//! is deliberately thin: one authn request, one factor verification (polled
//! for push), no state machine beyond that. Every failure is terminal.

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use log::debug;
use scraper::{Html, Selector};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::cli::MfaType;
use crate::error::AuthError;
use crate::saml::SamlAssertion;
use crate::ui::Ui;

/// Interval between push-factor polls.
const PUSH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Identity-provider boundary: session first, assertion second.
pub trait IdentityProvider {
    fn session_token(
        &self,
        username: &str,
        password: &str,
        mfa_type: MfaType,
        mfa_code: Option<&str>,
    ) -> Result<String, AuthError>;

    fn saml_assertion(&self, app_uri: &str, session_token: &str) -> Result<SamlAssertion, AuthError>;
}

pub struct OktaClient<'a> {
    http: reqwest::blocking::Client,
    base_uri: String,
    ui: &'a dyn Ui,
}

#[derive(Deserialize, Debug)]
struct AuthnResponse {
    status: String,
    #[serde(rename = "stateToken")]
    state_token: Option<String>,
    #[serde(rename = "sessionToken")]
    session_token: Option<String>,
    #[serde(rename = "_embedded")]
    embedded: Option<AuthnEmbedded>,
}

#[derive(Deserialize, Debug, Default)]
struct AuthnEmbedded {
    #[serde(default)]
    factors: Vec<MfaFactor>,
}

#[derive(Deserialize, Debug)]
struct MfaFactor {
    provider: String,
    #[serde(rename = "factorType")]
    factor_type: String,
    #[serde(rename = "_links")]
    links: HashMap<String, Link>,
}

#[derive(Deserialize, Debug)]
struct Link {
    href: String,
}

#[derive(Deserialize, Debug)]
struct VerifyResponse {
    status: String,
    #[serde(rename = "factorResult")]
    factor_result: Option<String>,
    #[serde(rename = "sessionToken")]
    session_token: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CreateSessionResponse {
    id: String,
}

impl<'a> OktaClient<'a> {
    /// Builds a client for the given org domain. Redirects are followed, but
    /// bounded, since the app page round-trips through a couple of them.
    pub fn new(domain: &str, ui: &'a dyn Ui) -> anyhow::Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::custom(|attempt| {
                if attempt.previous().len() > 5 {
                    attempt.error("too many redirects")
                } else {
                    attempt.follow()
                }
            }))
            .build()?;
        Ok(Self { http, base_uri: format!("https://{domain}"), ui })
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &serde_json::Value,
        fail: fn(String) -> AuthError,
    ) -> Result<T, AuthError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(fail(format!("HTTP {}: {}", status.as_u16(), detail.trim())));
        }
        response.json().map_err(|e| fail(e.to_string()))
    }

    fn verify_factor(
        &self,
        verify_url: &str,
        state_token: &str,
        pass_code: Option<&str>,
    ) -> Result<VerifyResponse, AuthError> {
        let mut body = serde_json::json!({ "stateToken": state_token });
        if let Some(code) = pass_code {
            body["passCode"] = serde_json::Value::String(code.to_string());
        }
        self.post_json(verify_url, &body, AuthError::SessionAcquisitionFailed)
    }

    /// Drives the selected factor to completion: push is polled until Okta
    /// reports a terminal result, code factors are triggered (call/sms) and
    /// then answered with the one-time code.
    fn complete_mfa(
        &self,
        factor: &MfaFactor,
        state_token: &str,
        mfa_type: MfaType,
        mfa_code: Option<&str>,
    ) -> Result<String, AuthError> {
        let verify_url = &factor
            .links
            .get("verify")
            .ok_or_else(|| {
                AuthError::SessionAcquisitionFailed(format!(
                    "factor {} has no verify link",
                    factor.factor_type
                ))
            })?
            .href;
        debug!("verifying {} factor via {}", factor.factor_type, verify_url);

        if !mfa_type.needs_code() {
            let mut response = self.verify_factor(verify_url, state_token, None)?;
            while response.status == "MFA_CHALLENGE"
                && response.factor_result.as_deref() == Some("WAITING")
            {
                thread::sleep(PUSH_POLL_INTERVAL);
                response = self.verify_factor(verify_url, state_token, None)?;
            }
            return session_token_from(response);
        }

        // Call and SMS challenges are delivered by an initial verify request
        // without a code; TOTP codes already exist on the user's device.
        if mfa_type != MfaType::Totp {
            self.verify_factor(verify_url, state_token, None)?;
        }
        let code = match mfa_code {
            Some(code) => code.to_string(),
            None => self
                .ui
                .read_line(&format!("MFA code ({} - {})", factor.provider, factor.factor_type))
                .map_err(|e| AuthError::SessionAcquisitionFailed(e.to_string()))?,
        };
        let response = self.verify_factor(verify_url, state_token, Some(&code))?;
        session_token_from(response)
    }
}

fn session_token_from(response: VerifyResponse) -> Result<String, AuthError> {
    if response.status == "SUCCESS" {
        if let Some(token) = response.session_token {
            return Ok(token);
        }
    }
    Err(AuthError::SessionAcquisitionFailed(format!(
        "factor verification ended with status {} ({})",
        response.status,
        response.factor_result.as_deref().unwrap_or("no result")
    )))
}

impl IdentityProvider for OktaClient<'_> {
    fn session_token(
        &self,
        username: &str,
        password: &str,
        mfa_type: MfaType,
        mfa_code: Option<&str>,
    ) -> Result<String, AuthError> {
        let body = serde_json::json!({ "username": username, "password": password });
        let response: AuthnResponse = self.post_json(
            &format!("{}/api/v1/authn", self.base_uri),
            &body,
            AuthError::SessionAcquisitionFailed,
        )?;
        debug!("authn status: {}", response.status);

        match response.status.as_str() {
            "SUCCESS" => response.session_token.ok_or_else(|| {
                AuthError::SessionAcquisitionFailed("login succeeded without a session token".into())
            }),
            "MFA_REQUIRED" => {
                let state_token = response.state_token.ok_or_else(|| {
                    AuthError::SessionAcquisitionFailed("MFA required but no state token".into())
                })?;
                let factors = response.embedded.unwrap_or_default().factors;
                let factor = factors
                    .iter()
                    .find(|f| f.factor_type == mfa_type.factor_type())
                    .ok_or_else(|| {
                        AuthError::SessionAcquisitionFailed(format!(
                            "no enrolled `{}` factor",
                            mfa_type.factor_type()
                        ))
                    })?;
                self.complete_mfa(factor, &state_token, mfa_type, mfa_code)
            }
            other => Err(AuthError::SessionAcquisitionFailed(format!(
                "unsupported authn status {other}"
            ))),
        }
    }

    fn saml_assertion(&self, app_uri: &str, session_token: &str) -> Result<SamlAssertion, AuthError> {
        let body = serde_json::json!({ "sessionToken": session_token });
        let session: CreateSessionResponse = self.post_json(
            &format!("{}/api/v1/sessions", self.base_uri),
            &body,
            AuthError::AssertionAcquisitionFailed,
        )?;

        let page = self
            .http
            .get(app_uri)
            .header("Cookie", format!("sid={}", session.id))
            .send()
            .map_err(|e| AuthError::AssertionAcquisitionFailed(e.to_string()))?
            .text()
            .map_err(|e| AuthError::AssertionAcquisitionFailed(e.to_string()))?;

        extract_saml_response(&page).map(SamlAssertion::new)
    }
}

/// Pulls the base64 assertion out of the app page's SAMLResponse form field.
pub fn extract_saml_response(page: &str) -> Result<String, AuthError> {
    let document = Html::parse_document(page);
    let selector = Selector::parse(r#"input[name="SAMLResponse"]"#)
        .map_err(|e| AuthError::AssertionAcquisitionFailed(format!("{e:?}")))?;

    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| {
            AuthError::AssertionAcquisitionFailed("no SAMLResponse field on the app page".into())
        })
}
