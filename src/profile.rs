//! Stored connection profiles.
//!
//! Profiles live in a `profiles.csv` file with the header
//! `Name,OktaAppURI,RoleARN,PrincipalARN`. The file is probed across an
//! ordered list of candidate locations; the first file that exists wins and
//! later candidates are never consulted, so entries are not merged across
//! files. Empty `RoleARN`/`PrincipalARN` cells defer the role choice to the
//! interactive menu.

use std::path::PathBuf;

use anyhow::Result;
use log::debug;
use serde::Deserialize;

use crate::cli::Args;
use crate::error::AuthError;

pub const PROFILES_FILE: &str = "profiles.csv";

/// One entry of the profiles file.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub app_uri: String,
    pub role_arn: Option<String>,
    pub principal_arn: Option<String>,
}

/// The effective target of an invocation, produced either from a profile or
/// from explicit arguments. Missing ARNs mean interactive selection.
#[derive(Debug, Clone)]
pub struct Target {
    pub app_uri: String,
    pub role_arn: Option<String>,
    pub principal_arn: Option<String>,
}

#[derive(Deserialize)]
struct ProfileRecord {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "OktaAppURI")]
    app_uri: String,
    #[serde(rename = "RoleARN", default)]
    role_arn: String,
    #[serde(rename = "PrincipalARN", default)]
    principal_arn: String,
}

impl From<ProfileRecord> for Profile {
    fn from(record: ProfileRecord) -> Self {
        let optional = |s: String| {
            let s = s.trim().to_string();
            if s.is_empty() { None } else { Some(s) }
        };
        Profile {
            name: record.name,
            app_uri: record.app_uri.trim().to_string(),
            role_arn: optional(record.role_arn),
            principal_arn: optional(record.principal_arn),
        }
    }
}

/// Resolves the parsed arguments into an effective target. Profile mode and
/// manual mode are mutually exclusive at the CLI layer, so exactly one branch
/// applies here.
pub fn resolve(args: &Args) -> Result<Target> {
    if let Some(name) = &args.profile {
        let profile = find_profile(name, &candidate_paths())?;
        debug!("profile `{}` -> {}", profile.name, profile.app_uri);
        return Ok(Target {
            app_uri: profile.app_uri,
            role_arn: profile.role_arn,
            principal_arn: profile.principal_arn,
        });
    }

    // clap guarantees app_uri is present when no profile was given.
    let app_uri = args
        .app_uri
        .clone()
        .ok_or_else(|| anyhow::anyhow!("either --profile or --app-uri is required"))?;
    Ok(Target {
        app_uri,
        role_arn: args.role_arn.clone(),
        principal_arn: args.principal_arn.clone(),
    })
}

/// Candidate profile-file locations, most specific first: next to the
/// executable, the per-user config directory, then documents and home.
pub fn candidate_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(PathBuf::from)) {
        paths.push(dir.join(PROFILES_FILE));
    }
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("okta-aws-creds").join(PROFILES_FILE));
    }
    if let Some(dir) = dirs::document_dir() {
        paths.push(dir.join(PROFILES_FILE));
    }
    if let Some(dir) = dirs::home_dir() {
        paths.push(dir.join(PROFILES_FILE));
    }
    paths
}

/// Looks up `name` (case-insensitively) in the first candidate file that
/// exists. A missing entry in that file is `ProfileNotFound`; later
/// candidates are deliberately not consulted.
pub fn find_profile(name: &str, candidates: &[PathBuf]) -> Result<Profile> {
    let Some(path) = candidates.iter().find(|p| p.is_file()) else {
        return Err(AuthError::ProfileNotFound(name.to_string()).into());
    };
    debug!("reading profiles from {}", path.display());

    let mut reader = csv::Reader::from_path(path)?;
    for record in reader.deserialize::<ProfileRecord>() {
        let record = record?;
        if record.name.eq_ignore_ascii_case(name) {
            return Ok(record.into());
        }
    }
    Err(AuthError::ProfileNotFound(name.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "Name,OktaAppURI,RoleARN,PrincipalARN\n";

    fn write_profiles(dir: &TempDir, name: &str, rows: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, format!("{HEADER}{rows}")).unwrap();
        path
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let path = write_profiles(
            &dir,
            PROFILES_FILE,
            "Dev,https://acme.okta.com/app/aws/x/sso/saml,arn:aws:iam::1:role/Dev,arn:aws:iam::1:saml-provider/Okta\n",
        );

        let profile = find_profile("dEv", &[path]).unwrap();
        assert_eq!(profile.name, "Dev");
        assert_eq!(profile.app_uri, "https://acme.okta.com/app/aws/x/sso/saml");
        assert_eq!(profile.role_arn.as_deref(), Some("arn:aws:iam::1:role/Dev"));
    }

    #[test]
    fn empty_arn_cells_defer_to_selection() {
        let dir = TempDir::new().unwrap();
        let path = write_profiles(&dir, PROFILES_FILE, "dev,https://acme.okta.com/app/a/sso/saml,,\n");

        let profile = find_profile("dev", &[path]).unwrap();
        assert!(profile.role_arn.is_none());
        assert!(profile.principal_arn.is_none());
    }

    #[test]
    fn unknown_profile_fails() {
        let dir = TempDir::new().unwrap();
        let path = write_profiles(&dir, PROFILES_FILE, "dev,https://acme.okta.com/app/a/sso/saml,,\n");

        let err = find_profile("prod", &[path]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AuthError>(),
            Some(AuthError::ProfileNotFound(name)) if name == "prod"
        ));
    }

    #[test]
    fn no_candidate_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = find_profile("dev", &[dir.path().join("absent.csv")]).unwrap_err();
        assert!(matches!(err.downcast_ref::<AuthError>(), Some(AuthError::ProfileNotFound(_))));
    }

    #[test]
    fn first_existing_file_wins_without_fallthrough() {
        let dir = TempDir::new().unwrap();
        let first = write_profiles(&dir, "first.csv", "dev,https://first.okta.com/app/a/sso/saml,,\n");
        let second = write_profiles(&dir, "second.csv", "prod,https://second.okta.com/app/b/sso/saml,,\n");

        // The entry defined only in the second file is invisible: the probe
        // stops at the first existing file.
        let missing = dir.path().join("missing.csv");
        let err = find_profile("prod", &[missing.clone(), first.clone(), second.clone()]).unwrap_err();
        assert!(matches!(err.downcast_ref::<AuthError>(), Some(AuthError::ProfileNotFound(_))));

        let profile = find_profile("dev", &[missing, first, second]).unwrap();
        assert_eq!(profile.app_uri, "https://first.okta.com/app/a/sso/saml");
    }
}
