//! Resource-to-patient mapping.
//!
//! Search pages contain whatever resource type the query targeted. A `Patient`
//! maps to its own `id`; any other resource maps to the patient named in its
//! `subject.reference`.
//!
//! # Reference Formats
//!
//! Only relative references resolve to an identifier:
//! - `Patient/123`
//! - `Patient/123/_history/2`
//!
//! Absolute URLs, contained (`#id`) and URN references yield nothing, as do
//! references without a `Type/id` shape.
//!
//! ```
//! use octofhir_cohort::mapper::extract_patient_ids;
//! use serde_json::json;
//!
//! let page = vec![
//!     json!({ "resourceType": "Patient", "id": "p1" }),
//!     json!({ "resourceType": "Condition", "subject": { "reference": "Patient/p2" } }),
//!     json!({ "resourceType": "Condition", "subject": { "reference": "p3" } }),
//! ];
//! assert_eq!(extract_patient_ids(&page), vec!["p1", "p2"]);
//! ```

use std::fmt;

use serde_json::Value;

use crate::model::is_valid_resource_type_name;

/// A parsed `Type/id` subject reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectReference {
    pub resource_type: String,
    pub id: String,
}

/// Why a subject reference could not be turned into an identifier.
///
/// Records carrying one of these are dropped from the page; the reason is only
/// visible at `trace` level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedReference {
    Empty,
    Contained(String),
    Urn(String),
    Absolute(String),
    Shape(String),
}

impl fmt::Display for MalformedReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty reference"),
            Self::Contained(id) => write!(f, "contained reference: #{id}"),
            Self::Urn(urn) => write!(f, "URN reference: {urn}"),
            Self::Absolute(url) => write!(f, "absolute reference: {url}"),
            Self::Shape(reference) => write!(f, "reference must be Type/id: {reference}"),
        }
    }
}

impl std::error::Error for MalformedReference {}

/// Parse a subject reference string into its type and id.
pub fn parse_subject_reference(reference: &str) -> Result<SubjectReference, MalformedReference> {
    let reference = reference.trim();
    if reference.is_empty() {
        return Err(MalformedReference::Empty);
    }
    if let Some(contained_id) = reference.strip_prefix('#') {
        return Err(MalformedReference::Contained(contained_id.to_string()));
    }
    if reference.starts_with("urn:") {
        return Err(MalformedReference::Urn(reference.to_string()));
    }
    if reference.contains("://") {
        return Err(MalformedReference::Absolute(reference.to_string()));
    }

    let parts: Vec<&str> = reference.split('/').collect();
    let versioned = parts.len() == 4 && parts[2] == "_history" && !parts[3].is_empty();
    if parts.len() != 2 && !versioned {
        return Err(MalformedReference::Shape(reference.to_string()));
    }

    let (resource_type, id) = (parts[0], parts[1]);
    if !is_valid_resource_type_name(resource_type) || id.is_empty() {
        return Err(MalformedReference::Shape(reference.to_string()));
    }

    Ok(SubjectReference {
        resource_type: resource_type.to_string(),
        id: id.to_string(),
    })
}

/// The patient identifier a single resource pertains to, if any.
pub fn patient_id_of(resource: &Value) -> Option<String> {
    if resource.get("resourceType").and_then(Value::as_str) == Some("Patient") {
        return resource
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    let reference = resource
        .get("subject")
        .and_then(|subject| subject.get("reference"))
        .and_then(Value::as_str)?;

    match parse_subject_reference(reference) {
        Ok(subject) => Some(subject.id),
        Err(reason) => {
            tracing::trace!(%reason, "dropping resource with unusable subject reference");
            None
        }
    }
}

/// Patient identifiers for a page of resources, in page order. Duplicates are kept.
pub fn extract_patient_ids(page: &[Value]) -> Vec<String> {
    page.iter().filter_map(patient_id_of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patient_and_subject_reference() {
        let page = vec![
            json!({ "resourceType": "Patient", "id": "p1" }),
            json!({ "resourceType": "Observation", "subject": { "reference": "Patient/p2" } }),
        ];
        assert_eq!(extract_patient_ids(&page), vec!["p1", "p2"]);
    }

    #[test]
    fn test_reference_without_separator_is_dropped() {
        let page = vec![json!({ "resourceType": "Condition", "subject": { "reference": "p3" } })];
        assert!(extract_patient_ids(&page).is_empty());
    }

    #[test]
    fn test_missing_subject_is_dropped() {
        let page = vec![
            json!({ "resourceType": "Condition", "id": "c1" }),
            json!({ "resourceType": "Condition", "subject": { "display": "Jane" } }),
            json!({ "resourceType": "Patient" }),
        ];
        assert!(extract_patient_ids(&page).is_empty());
    }

    #[test]
    fn test_duplicates_are_kept_in_page_order() {
        let page = vec![
            json!({ "resourceType": "Condition", "subject": { "reference": "Patient/b" } }),
            json!({ "resourceType": "Condition", "subject": { "reference": "Patient/a" } }),
            json!({ "resourceType": "Condition", "subject": { "reference": "Patient/b" } }),
        ];
        assert_eq!(extract_patient_ids(&page), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_versioned_reference() {
        let r = parse_subject_reference("Patient/123/_history/2").unwrap();
        assert_eq!(r.resource_type, "Patient");
        assert_eq!(r.id, "123");
    }

    #[test]
    fn test_unresolvable_reference_forms() {
        assert_eq!(parse_subject_reference("  "), Err(MalformedReference::Empty));
        assert!(matches!(
            parse_subject_reference("#pat"),
            Err(MalformedReference::Contained(id)) if id == "pat"
        ));
        assert!(matches!(
            parse_subject_reference("urn:uuid:550e8400-e29b-41d4-a716-446655440000"),
            Err(MalformedReference::Urn(_))
        ));
        assert!(matches!(
            parse_subject_reference("http://example.org/fhir/Patient/1"),
            Err(MalformedReference::Absolute(_))
        ));
        assert!(matches!(
            parse_subject_reference("patient/1"),
            Err(MalformedReference::Shape(_))
        ));
        assert!(matches!(
            parse_subject_reference("Patient/"),
            Err(MalformedReference::Shape(_))
        ));
        assert!(matches!(
            parse_subject_reference("Patient/1/extra"),
            Err(MalformedReference::Shape(_))
        ));
    }

    #[test]
    fn test_non_patient_subject_kind_still_yields_id() {
        let resource = json!({ "resourceType": "Observation", "subject": { "reference": "Group/g1" } });
        assert_eq!(patient_id_of(&resource), Some("g1".to_string()));
    }
}
