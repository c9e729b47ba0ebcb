//! Command-line interface definitions.

use std::fmt;

use clap::{ArgGroup, Parser, ValueEnum};

/// Okta SAML to AWS credentials.
///
/// Logs into Okta, fetches the SAML assertion for an AWS application and
/// exchanges it for temporary credentials, which are published into the
/// process environment. Nothing is written to disk.
#[derive(Parser)]
#[command(author, version, about)]
#[command(group(ArgGroup::new("target").required(true).args(["profile", "app_uri"])))]
pub struct Args {
    /// Stored profile to take the app URI and role ARNs from
    #[arg(short, long, conflicts_with_all = ["app_uri", "role_arn", "principal_arn"])]
    pub profile: Option<String>,

    /// Okta application URI (https://<org>.okta.com/app/.../sso/saml)
    #[arg(short, long, env = "OKTA_APP_URI")]
    pub app_uri: Option<String>,

    /// ARN of the role to assume; omit to choose interactively
    #[arg(short, long, requires = "principal_arn")]
    pub role_arn: Option<String>,

    /// ARN of the SAML identity provider trusted by the account
    #[arg(long, requires = "role_arn")]
    pub principal_arn: Option<String>,

    /// Okta username; the password is always prompted for
    #[arg(short, long, env = "OKTA_USERNAME")]
    pub username: String,

    /// MFA method to verify the login with
    #[arg(short, long, value_enum, default_value_t = MfaType::Push)]
    pub mfa_type: MfaType,

    /// One-time code for the sms/call/totp factors; prompted for if omitted
    #[arg(long)]
    pub mfa_code: Option<String>,
}

/// Okta MFA factor selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MfaType {
    Call,
    Push,
    Sms,
    Totp,
}

impl MfaType {
    /// The `factorType` value Okta uses for this factor.
    pub fn factor_type(self) -> &'static str {
        match self {
            MfaType::Call => "call",
            MfaType::Push => "push",
            MfaType::Sms => "sms",
            MfaType::Totp => "token:software:totp",
        }
    }

    /// Whether the factor is verified with a user-supplied code rather than
    /// by polling Okta.
    pub fn needs_code(self) -> bool {
        !matches!(self, MfaType::Push)
    }
}

impl fmt::Display for MfaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MfaType::Call => "call",
            MfaType::Push => "push",
            MfaType::Sms => "sms",
            MfaType::Totp => "totp",
        };
        f.write_str(name)
    }
}
