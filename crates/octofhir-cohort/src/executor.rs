//! Single-query execution against a paged search backend.

use futures_util::TryStreamExt;
use tracing::{debug, instrument, warn};

use crate::error::{CohortError, CohortResult};
use crate::mapper::extract_patient_ids;
use crate::model::Query;
use crate::traits::PagedSearch;

/// Runs one query to completion and collects the patient ids of every page.
pub struct QueryExecutor<'a, B: PagedSearch + ?Sized> {
    backend: &'a B,
}

impl<'a, B: PagedSearch + ?Sized> QueryExecutor<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Drains every page of `query` in backend order.
    ///
    /// Ids keep page order and are not deduplicated.
    ///
    /// # Errors
    ///
    /// Returns `CohortError::BackendQuery` on the first failed page fetch.
    /// Nothing collected before the failure is returned.
    #[instrument(
        name = "execute_query",
        skip_all,
        fields(resource = %query.resource, filter = %query.search_params, backend = self.backend.backend_name())
    )]
    pub async fn execute(&self, query: &Query) -> CohortResult<Vec<String>> {
        let mut pages = self
            .backend
            .search_pages(&query.resource, &query.search_params);
        let mut patient_ids = Vec::new();
        let mut page_count = 0usize;

        loop {
            let page = match pages.try_next().await {
                Ok(Some(page)) => page,
                Ok(None) => break,
                Err(source) => {
                    warn!(page = page_count, error = %source, "page fetch failed");
                    return Err(CohortError::backend_query(
                        query.resource.to_string(),
                        query.search_params.clone(),
                        source,
                    ));
                }
            };
            let ids = extract_patient_ids(&page);
            debug!(
                page = page_count,
                resources = page.len(),
                ids = ids.len(),
                "page mapped"
            );
            patient_ids.extend(ids);
            page_count += 1;
        }

        debug!(pages = page_count, ids = patient_ids.len(), "query drained");
        Ok(patient_ids)
    }
}
