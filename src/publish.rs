//! Publishing credentials into the process environment.
//!
//! The environment is the only output channel: credentials are scoped to the
//! process tree and are never written to a file. The sink is a trait so
//! tests can capture the writes in memory.

use log::info;

use crate::exchange::CredentialBundle;

pub const ACCESS_KEY_ID_VAR: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY_VAR: &str = "AWS_SECRET_ACCESS_KEY";
pub const SESSION_TOKEN_VAR: &str = "AWS_SESSION_TOKEN";

/// Environment-like sink for the three credential variables.
pub trait CredentialSink {
    fn set(&mut self, key: &str, value: &str);
}

/// The real process environment.
pub struct ProcessEnv;

impl CredentialSink for ProcessEnv {
    fn set(&mut self, key: &str, value: &str) {
        // SAFETY: the tool is single-threaded, so nothing reads the
        // environment concurrently with this write.
        unsafe { std::env::set_var(key, value) };
    }
}

/// Writes the bundle into the sink. Only called on the fully successful
/// path; every failure before this point leaves the environment untouched.
pub fn publish(bundle: &CredentialBundle, sink: &mut dyn CredentialSink) {
    sink.set(ACCESS_KEY_ID_VAR, &bundle.access_key_id);
    sink.set(SECRET_ACCESS_KEY_VAR, &bundle.secret_access_key);
    sink.set(SESSION_TOKEN_VAR, &bundle.session_token);
    info!("session credentials published to the process environment");
}
