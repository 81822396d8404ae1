//! Credentials from environment variables.

use super::AwsCredentials;
use std::env;

/// Access key ID variable.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Secret access key variable.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
/// Optional session token variable.
pub const AWS_SESSION_TOKEN: &str = "AWS_SESSION_TOKEN";

fn non_empty(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

pub(super) fn load() -> Option<AwsCredentials> {
    let access_key_id = non_empty(AWS_ACCESS_KEY_ID)?;
    let secret_access_key = non_empty(AWS_SECRET_ACCESS_KEY)?;

    Some(match non_empty(AWS_SESSION_TOKEN) {
        Some(token) => AwsCredentials::with_session_token(access_key_id, secret_access_key, token),
        None => AwsCredentials::new(access_key_id, secret_access_key),
    })
}
