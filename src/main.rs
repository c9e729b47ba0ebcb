//! Okta SAML to AWS credentials.
//!
//! Single-pass pipeline, one invocation per run:
//! 1. Resolve the target app URI and optional role ARNs from a stored
//!    profile or explicit arguments
//! 2. Validate the application URI and extract the Okta org domain
//! 3. Log into Okta and fetch the SAML assertion for the application
//! 4. Pick the role to assume, automatically or through a grouped menu
//! 5. Exchange role, principal and assertion for temporary credentials
//! 6. Publish the credentials into the process environment
//!
//! Every failure is terminal and leaves the environment untouched;
//! credentials are never written to disk. Concurrent invocations in other
//! shells are independent by design, which is what makes multiple sessions
//! with different credentials possible.

use anyhow::Result;
use clap::Parser;
use log::info;

mod cli;
mod endpoint;
mod error;
mod exchange;
mod okta;
mod profile;
mod publish;
mod saml;
mod ui;

use cli::Args;
use exchange::{AwsCliExchanger, CredentialExchanger};
use okta::{IdentityProvider, OktaClient};
use publish::ProcessEnv;
use saml::RolePair;
use ui::{StdUi, Ui};

fn main() -> Result<()> {
    // INFO by default for visibility into the pipeline steps; RUST_LOG
    // overrides as usual.
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = Args::parse();

    let target = profile::resolve(&args)?;
    let domain = endpoint::provider_domain(&target.app_uri)?;
    info!("authenticating against {domain}");

    // Probe for the AWS CLI before prompting for anything: a missing
    // dependency should not cost the user a login.
    let exchanger = AwsCliExchanger::locate()?;

    let stdui = StdUi;
    let password = stdui.read_password(&format!("Password for {}", args.username))?;

    let okta = OktaClient::new(&domain, &stdui)?;
    let session_token =
        okta.session_token(&args.username, &password, args.mfa_type, args.mfa_code.as_deref())?;
    let assertion = okta.saml_assertion(&target.app_uri, &session_token)?;

    // Exactly one role pair is resolved before the exchange runs: either the
    // preconfigured one, or one picked from the assertion.
    let role = match (target.role_arn, target.principal_arn) {
        (Some(role_arn), Some(principal_arn)) => RolePair::new(principal_arn, role_arn),
        _ => {
            let pairs = assertion.role_pairs()?;
            ui::select_role(&pairs, &stdui)?.clone()
        }
    };
    info!("assuming {}", role.role_arn);

    let bundle = exchanger.exchange(&role, &assertion)?;
    publish::publish(&bundle, &mut ProcessEnv);
    if let Some(expiration) = &bundle.expiration {
        info!("credentials valid until {expiration}");
    }

    Ok(())
}
