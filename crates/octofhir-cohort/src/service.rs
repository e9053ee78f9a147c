//! End-to-end cohort creation: translate, resolve, assemble, persist.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::{CohortError, CohortResult};
use crate::group::{GroupOptions, build_group};
use crate::model::{CohortSpec, ResolvedCohort};
use crate::resolver::CohortResolver;
use crate::traits::{CohortRequest, GroupSink, PagedSearch, Translator};

/// Result of a cohort creation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortOutcome {
    /// Informational SQL rendering returned by the translator.
    pub sql: String,
    pub cohort: ResolvedCohort,
    /// The stored `Group` when a sink is configured, otherwise the assembled one.
    pub group: Value,
    pub persisted: bool,
}

/// Wires the collaborators together.
///
/// Holds no per-request state; one service can serve many requests.
pub struct CohortService {
    translator: Option<Arc<dyn Translator>>,
    backend: Arc<dyn PagedSearch>,
    sink: Option<Arc<dyn GroupSink>>,
    group_options: GroupOptions,
}

impl CohortService {
    pub fn new(translator: Arc<dyn Translator>, backend: Arc<dyn PagedSearch>) -> Self {
        Self {
            translator: Some(translator),
            ..Self::for_backend(backend)
        }
    }

    /// A service without a translator. Only [`resolve_spec`](Self::resolve_spec) is usable.
    pub fn for_backend(backend: Arc<dyn PagedSearch>) -> Self {
        Self {
            translator: None,
            backend,
            sink: None,
            group_options: GroupOptions::default(),
        }
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn GroupSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn with_group_options(mut self, options: GroupOptions) -> Self {
        self.group_options = options;
        self
    }

    /// Translates `request` and resolves the resulting queries.
    ///
    /// # Errors
    ///
    /// Propagates translation, backend and persistence failures unchanged.
    /// Fails with `CohortError::Configuration` when no translator is set.
    pub async fn create_cohort(&self, request: &CohortRequest) -> CohortResult<CohortOutcome> {
        let translator = self
            .translator
            .as_ref()
            .ok_or_else(|| CohortError::configuration("no translator configured"))?;
        let spec = translator.translate(request).await?;
        info!(
            queries = spec.queries.len(),
            description = %spec.cohort_description,
            "cohort request translated"
        );
        self.resolve_spec(spec).await
    }

    /// Resolves an already translated spec.
    pub async fn resolve_spec(&self, spec: CohortSpec) -> CohortResult<CohortOutcome> {
        let cohort = CohortResolver::new(self.backend.as_ref())
            .resolve(&spec)
            .await?;
        let group = build_group(&cohort, &self.group_options);

        let (group, persisted) = match &self.sink {
            Some(sink) => {
                let stored = sink.persist(group).await?;
                let id = stored.get("id").and_then(Value::as_str).unwrap_or("-");
                info!(
                    id,
                    members = cohort.member_ids.len(),
                    "cohort group persisted"
                );
                (stored, true)
            }
            None => (group, false),
        };

        Ok(CohortOutcome {
            sql: spec.sql,
            cohort,
            group,
            persisted,
        })
    }
}
