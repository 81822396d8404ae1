//! Access credentials.
//!
//! A client holds one immutable set of credentials for its lifetime. The
//! secret half is kept in a [`SecretString`] and redacted from debug output.

mod env;

pub use env::{AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY, AWS_SESSION_TOKEN};

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

const REDACTED: &str = "** redacted **";

/// Key pair used to sign requests, optionally with a session token.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
}

impl AwsCredentials {
    /// Long-term key pair.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
        }
    }

    /// Temporary key pair; the token is sent as `x-amz-security-token`.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            session_token: Some(SecretString::new(session_token.into())),
            ..Self::new(access_key_id, secret_access_key)
        }
    }

    /// Key pair from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and
    /// `AWS_SESSION_TOKEN`; `None` unless both key halves are non-empty.
    pub fn from_env() -> Option<Self> {
        env::load()
    }

    /// Public key identifier, safe to log.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The signing secret.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Session token of temporary credentials.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token
            .as_ref()
            .map(|token| token.expose_secret().as_str())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("AwsCredentials");
        debug
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED);
        if self.session_token.is_some() {
            debug.field("session_token", &REDACTED);
        }
        debug.finish()
    }
}
