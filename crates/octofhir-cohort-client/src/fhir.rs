//! FHIR REST client: paged search and `Group` creation.

use std::collections::HashSet;

use async_trait::async_trait;
use futures_util::{future, stream};
use octofhir_cohort::{
    BackendError, CohortError, CohortResult, GroupSink, PageStream, PagedSearch, ResourceKind,
};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::config::FhirServerConfig;

const FHIR_JSON: &str = "application/fhir+json";

/// Paging state: the page to fetch next and every page already fetched.
/// A `next` link back to a fetched page ends the search.
struct PageCursor {
    next: Option<Url>,
    visited: HashSet<Url>,
}

impl PageCursor {
    fn start(first: Url) -> Self {
        Self {
            next: Some(first),
            visited: HashSet::new(),
        }
    }
}

/// Client for a FHIR server's search and create interactions.
pub struct FhirClient {
    http: reqwest::Client,
    /// Always ends with `/` so relative joins stay under the FHIR base.
    base_url: Url,
    bearer_token: Option<String>,
    page_size: Option<u32>,
}

impl FhirClient {
    /// # Errors
    ///
    /// Returns `CohortError::Configuration` for an invalid base URL or when
    /// the HTTP client cannot be built.
    pub fn new(config: &FhirServerConfig) -> CohortResult<Self> {
        config.validate().map_err(CohortError::configuration)?;
        let base_url = Url::parse(&format!("{}/", config.base_url.trim_end_matches('/')))
            .map_err(|e| CohortError::configuration(format!("invalid fhir.base_url: {e}")))?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| CohortError::configuration(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            bearer_token: config.bearer_token.clone(),
            page_size: config.page_size,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let mut req = self.http.request(method, url);
        if let Some(token) = &self.bearer_token {
            req = req.bearer_auth(token);
        }
        req.header("Accept", FHIR_JSON)
    }

    /// URL of the first page: `{base}/{Type}?{search_params}` plus `_count`
    /// when a page size is configured and the query has none.
    pub fn search_url(
        &self,
        resource: &ResourceKind,
        search_params: &str,
    ) -> Result<Url, BackendError> {
        let mut url = self.base_url.join(resource.as_str()).map_err(|e| {
            BackendError::transport(format!("cannot build search URL for {resource}: {e}"))
        })?;

        let mut query = search_params.trim_start_matches('?').to_string();
        if let Some(count) = self.page_size.filter(|_| !has_count_param(&query)) {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&format!("_count={count}"));
        }
        if !query.is_empty() {
            url.set_query(Some(&query));
        }
        Ok(url)
    }

    async fn fetch_page(&self, url: Url) -> Result<(Vec<Value>, Option<Url>), BackendError> {
        debug!(%url, "fetching search page");
        let resp = self
            .request(Method::GET, url.clone())
            .send()
            .await
            .map_err(|e| BackendError::transport(format!("request to {url} failed: {e}")))?;
        let bundle = read_json(resp).await?;

        if bundle.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
            return Err(BackendError::transport(format!(
                "expected a Bundle from {url}"
            )));
        }

        let next = next_link(&bundle)
            .map(|link| {
                self.base_url
                    .join(link)
                    .map_err(|e| BackendError::transport(format!("invalid next link {link}: {e}")))
            })
            .transpose()?;

        Ok((bundle_matches(bundle), next))
    }

    async fn next_page(
        &self,
        mut cursor: PageCursor,
    ) -> Result<Option<(Vec<Value>, PageCursor)>, BackendError> {
        let Some(url) = cursor.next.take() else {
            return Ok(None);
        };
        let (page, next) = self.fetch_page(url.clone()).await?;
        cursor.visited.insert(url);

        cursor.next = match next {
            Some(next) if cursor.visited.contains(&next) => {
                warn!(%next, "next link revisits a fetched page, stopping");
                None
            }
            next => next,
        };
        Ok(Some((page, cursor)))
    }

    /// Creates a resource and returns the server's copy.
    pub async fn create(&self, resource_type: &str, body: &Value) -> Result<Value, BackendError> {
        let url = self.base_url.join(resource_type).map_err(|e| {
            BackendError::transport(format!("cannot build create URL for {resource_type}: {e}"))
        })?;
        let resp = self
            .request(Method::POST, url.clone())
            .header("Content-Type", FHIR_JSON)
            .json(body)
            .send()
            .await
            .map_err(|e| BackendError::transport(format!("request to {url} failed: {e}")))?;
        read_json(resp).await
    }
}

impl PagedSearch for FhirClient {
    fn search_pages<'a>(
        &'a self,
        resource: &'a ResourceKind,
        search_params: &'a str,
    ) -> PageStream<'a> {
        let first = match self.search_url(resource, search_params) {
            Ok(url) => url,
            Err(err) => return Box::pin(stream::once(future::ready(Err::<Vec<Value>, _>(err)))),
        };
        Box::pin(stream::try_unfold(PageCursor::start(first), move |cursor| {
            self.next_page(cursor)
        }))
    }

    fn backend_name(&self) -> &'static str {
        "fhir-rest"
    }
}

#[async_trait]
impl GroupSink for FhirClient {
    async fn persist(&self, group: Value) -> CohortResult<Value> {
        self.create("Group", &group)
            .await
            .map_err(|e| CohortError::persistence(e.to_string()))
    }
}

fn has_count_param(query: &str) -> bool {
    query
        .split('&')
        .any(|pair| pair.split('=').next() == Some("_count"))
}

fn next_link(bundle: &Value) -> Option<&str> {
    bundle
        .get("link")?
        .as_array()?
        .iter()
        .find(|link| link.get("relation").and_then(Value::as_str) == Some("next"))?
        .get("url")?
        .as_str()
}

/// Resources of the bundle's match entries. Included resources and
/// OperationOutcome entries are not part of the result set.
fn bundle_matches(bundle: Value) -> Vec<Value> {
    let Value::Object(mut bundle) = bundle else {
        return Vec::new();
    };
    let Some(Value::Array(entries)) = bundle.remove("entry") else {
        return Vec::new();
    };
    entries
        .into_iter()
        .filter(|entry| {
            !matches!(
                entry
                    .get("search")
                    .and_then(|s| s.get("mode"))
                    .and_then(Value::as_str),
                Some("include" | "outcome")
            )
        })
        .filter_map(|mut entry| entry.get_mut("resource").map(Value::take))
        .collect()
}

async fn read_json(resp: reqwest::Response) -> Result<Value, BackendError> {
    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| BackendError::transport(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        let reason = operation_outcome_diagnostics(&body)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or(body);
        return Err(BackendError::http(status.as_u16(), reason));
    }

    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body)
        .map_err(|e| BackendError::transport(format!("failed to parse response JSON: {e}")))
}

fn operation_outcome_diagnostics(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    if json.get("resourceType").and_then(Value::as_str) != Some("OperationOutcome") {
        return None;
    }
    let msgs: Vec<&str> = json
        .get("issue")?
        .as_array()?
        .iter()
        .filter_map(|i| i.get("diagnostics").and_then(Value::as_str))
        .collect();
    (!msgs.is_empty()).then(|| msgs.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client(page_size: Option<u32>) -> FhirClient {
        FhirClient::new(&FhirServerConfig {
            page_size,
            ..FhirServerConfig::new("https://fhir.example.org/r4")
        })
        .unwrap()
    }

    #[test]
    fn test_search_url_forwards_params_verbatim() {
        let url = client(None)
            .search_url(&ResourceKind::Condition, "code=http://snomed.info/sct|55822004")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://fhir.example.org/r4/Condition?code=http://snomed.info/sct|55822004"
        );
    }

    #[test]
    fn test_search_url_page_size() {
        let c = client(Some(200));
        assert_eq!(
            c.search_url(&ResourceKind::Patient, "").unwrap().as_str(),
            "https://fhir.example.org/r4/Patient?_count=200"
        );
        assert_eq!(
            c.search_url(&ResourceKind::Patient, "gender=female")
                .unwrap()
                .as_str(),
            "https://fhir.example.org/r4/Patient?gender=female&_count=200"
        );
        assert_eq!(
            c.search_url(&ResourceKind::Patient, "_count=10&gender=male")
                .unwrap()
                .as_str(),
            "https://fhir.example.org/r4/Patient?_count=10&gender=male"
        );
    }

    #[test]
    fn test_bundle_matches_skips_included_entries() {
        let bundle = json!({
            "resourceType": "Bundle",
            "entry": [
                { "resource": { "resourceType": "Condition", "id": "c1" }, "search": { "mode": "match" } },
                { "resource": { "resourceType": "Patient", "id": "p1" }, "search": { "mode": "include" } },
                { "resource": { "resourceType": "Condition", "id": "c2" } },
                { "fullUrl": "urn:uuid:no-resource" }
            ]
        });
        let page = bundle_matches(bundle);
        let ids: Vec<&str> = page.iter().filter_map(|r| r["id"].as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
    }

    #[test]
    fn test_next_link() {
        let bundle = json!({
            "link": [
                { "relation": "self", "url": "https://x/Patient?page=1" },
                { "relation": "next", "url": "https://x/Patient?page=2" }
            ]
        });
        assert_eq!(next_link(&bundle), Some("https://x/Patient?page=2"));
        assert_eq!(next_link(&json!({ "link": [] })), None);
    }

    #[test]
    fn test_operation_outcome_diagnostics() {
        let body = json!({
            "resourceType": "OperationOutcome",
            "issue": [
                { "severity": "error", "diagnostics": "Unknown search parameter 'foo'" },
                { "severity": "error", "diagnostics": "Invalid date" }
            ]
        })
        .to_string();
        assert_eq!(
            operation_outcome_diagnostics(&body).as_deref(),
            Some("Unknown search parameter 'foo'; Invalid date")
        );
        assert_eq!(operation_outcome_diagnostics("not json"), None);
    }
}
