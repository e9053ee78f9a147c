//! Translation service client.

use async_trait::async_trait;
use octofhir_cohort::{CohortError, CohortRequest, CohortResult, CohortSpec, Translator};
use tracing::{debug, warn};

use crate::auth::acquire_token;
use crate::config::PhenomlConfig;

const COHORT_PATH: &str = "construe/cohort";

/// Translates free text into a [`CohortSpec`] through the `construe/cohort` endpoint.
pub struct PhenomlTranslator {
    http: reqwest::Client,
    config: PhenomlConfig,
}

impl PhenomlTranslator {
    /// Builds a translator. Credentials are checked here, not on first use.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::Configuration` for an invalid base URL, missing
    /// credentials, or when the HTTP client cannot be built.
    pub fn new(config: PhenomlConfig) -> CohortResult<Self> {
        config.validate().map_err(CohortError::configuration)?;
        config
            .require_credentials()
            .map_err(CohortError::configuration)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CohortError::configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { http, config })
    }
}

#[async_trait]
impl Translator for PhenomlTranslator {
    async fn translate(&self, request: &CohortRequest) -> CohortResult<CohortSpec> {
        let token = acquire_token(&self.http, &self.config).await?;

        let resp = self
            .http
            .post(self.config.endpoint(COHORT_PATH))
            .bearer_auth(&token)
            .json(request)
            .send()
            .await
            .map_err(|e| CohortError::translation(format!("cohort request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "translation service rejected cohort request");
            return Err(CohortError::translation(status.to_string()));
        }

        let spec: CohortSpec = resp
            .json()
            .await
            .map_err(|e| CohortError::translation(format!("malformed cohort response: {e}")))?;
        debug!(queries = spec.queries.len(), "cohort spec received");
        Ok(spec)
    }
}
