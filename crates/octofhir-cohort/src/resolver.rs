//! Cohort resolution: execute every query in order and fold the results.

use tracing::{info, instrument, warn};

use crate::combinator::SetAccumulator;
use crate::error::CohortResult;
use crate::executor::QueryExecutor;
use crate::model::{CohortSpec, ResolvedCohort, TraceAnnotation};
use crate::traits::PagedSearch;

/// Resolves a [`CohortSpec`] against a paged search backend.
///
/// Queries run strictly one after another: each fold step depends on the
/// list accumulated by the previous ones.
pub struct CohortResolver<'a, B: PagedSearch + ?Sized> {
    executor: QueryExecutor<'a, B>,
}

impl<'a, B: PagedSearch + ?Sized> CohortResolver<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self {
            executor: QueryExecutor::new(backend),
        }
    }

    /// Runs every query of `spec` and returns the deduplicated cohort.
    ///
    /// # Errors
    ///
    /// The first failing query aborts the resolution with its
    /// `CohortError::BackendQuery`; no partial cohort is produced.
    #[instrument(skip_all, fields(queries = spec.queries.len()))]
    pub async fn resolve(&self, spec: &CohortSpec) -> CohortResult<ResolvedCohort> {
        let mut accumulator = SetAccumulator::new();
        let mut traceability = Vec::with_capacity(spec.queries.len());

        for (position, query) in spec.queries.iter().enumerate() {
            let ids = self.executor.execute(query).await.inspect_err(|err| {
                warn!(position, category = %err.category(), error = %err, "cohort resolution aborted");
            })?;
            info!(
                position,
                resource = %query.resource,
                exclude = query.exclude,
                ids = ids.len(),
                "query executed"
            );
            accumulator.fold(query.exclude, ids);
            traceability.push(TraceAnnotation::from(query));
        }

        let member_ids = accumulator.finish();
        info!(members = member_ids.len(), "cohort resolved");

        Ok(ResolvedCohort {
            member_ids,
            traceability,
            cohort_description: spec.cohort_description.clone(),
            code_extracts: spec.code_extracts(),
        })
    }
}
