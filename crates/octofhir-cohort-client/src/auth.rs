//! Password login against the translation service.
//!
//! A token is acquired for each translation and dropped afterwards; nothing
//! is cached between requests.

use octofhir_cohort::{CohortError, CohortResult};
use serde::{Deserialize, Serialize};

use crate::config::PhenomlConfig;

const AUTH_PATH: &str = "api/collections/users/auth-with-password";

#[derive(Serialize)]
struct PasswordLogin<'a> {
    identity: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
}

/// Exchanges the configured client credentials for a bearer token.
pub async fn acquire_token(http: &reqwest::Client, config: &PhenomlConfig) -> CohortResult<String> {
    let resp = http
        .post(config.endpoint(AUTH_PATH))
        .json(&PasswordLogin {
            identity: &config.client_id,
            password: &config.client_secret,
        })
        .send()
        .await
        .map_err(|e| CohortError::translation(format!("authentication request failed: {e}")))?;

    let status = resp.status();
    if !status.is_success() {
        return Err(CohortError::translation(format!(
            "authentication failed: {status}"
        )));
    }

    let body: TokenResponse = resp
        .json()
        .await
        .map_err(|e| CohortError::translation(format!("malformed authentication response: {e}")))?;

    body.token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CohortError::translation("authentication response carried no token"))
}
