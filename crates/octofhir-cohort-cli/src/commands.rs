use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use octofhir_cohort::{CohortService, CohortSpec, DynSearch, Translator};
use octofhir_cohort_client::{FhirClient, PhenomlTranslator};
use tracing::info;

use crate::cli::{ExecuteArgs, OutputFormat, ResolveArgs, TranslationArgs};
use crate::config::AppConfig;
use crate::output::{print_outcome, print_spec, print_success};

fn make_translator(cfg: &AppConfig) -> Result<PhenomlTranslator> {
    PhenomlTranslator::new(cfg.phenoml.clone()).context("Cannot create translation client")
}

fn make_fhir_client(cfg: &AppConfig) -> Result<Arc<FhirClient>> {
    let client = FhirClient::new(&cfg.fhir).context("Cannot create FHIR client")?;
    Ok(Arc::new(client))
}

fn make_service(
    cfg: &AppConfig,
    translator: Option<Arc<dyn Translator>>,
    persist: bool,
) -> Result<CohortService> {
    let client = make_fhir_client(cfg)?;
    let backend: DynSearch = client.clone();
    let service = match translator {
        Some(translator) => CohortService::new(translator, backend),
        None => CohortService::for_backend(backend),
    }
    .with_group_options(cfg.group.options());
    Ok(if persist {
        service.with_sink(client)
    } else {
        service
    })
}

pub fn read_spec(path: &Path) -> Result<CohortSpec> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid cohort spec: {}", path.display()))
}

pub async fn translate(cfg: &AppConfig, args: &TranslationArgs, format: OutputFormat) -> Result<()> {
    let translator = make_translator(cfg)?;
    let spec = translator.translate(&args.request()).await?;
    info!(queries = spec.queries.len(), "translated");
    print_spec(&spec, format)
}

pub async fn resolve(cfg: &AppConfig, args: &ResolveArgs, format: OutputFormat) -> Result<()> {
    let persist = args.persist || cfg.group.persist;
    let translator: Arc<dyn Translator> = Arc::new(make_translator(cfg)?);
    let service = make_service(cfg, Some(translator), persist)?;

    let outcome = service
        .create_cohort(&args.translation.request())
        .await
        .context("Cohort resolution failed")?;
    if outcome.persisted {
        print_success(&format!(
            "Stored cohort group with {} members",
            outcome.cohort.member_ids.len()
        ));
    }
    print_outcome(&outcome, format)
}

pub async fn execute(cfg: &AppConfig, args: &ExecuteArgs, format: OutputFormat) -> Result<()> {
    let spec = read_spec(&args.spec)?;
    let persist = args.persist || cfg.group.persist;
    let service = make_service(cfg, None, persist)?;

    let outcome = service
        .resolve_spec(spec)
        .await
        .context("Cohort resolution failed")?;
    if outcome.persisted {
        print_success(&format!(
            "Stored cohort group with {} members",
            outcome.cohort.member_ids.len()
        ));
    }
    print_outcome(&outcome, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_spec() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "queries": [
                    {{ "resource": "Patient", "searchParams": "gender=female", "exclude": false }},
                    {{ "resource": "Patient", "searchParams": "deceased=true", "exclude": true }}
                ],
                "cohortDescription": "living women"
            }}"#
        )
        .unwrap();

        let spec = read_spec(file.path()).unwrap();
        assert_eq!(spec.cohort_description, "living women");
        assert_eq!(spec.queries.len(), 2);
        assert!(spec.queries[1].exclude);
    }

    #[test]
    fn test_read_spec_errors_name_the_file() {
        let err = read_spec(Path::new("/nonexistent/cohort.json")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/cohort.json"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ \"queries\": 5 }}").unwrap();
        assert!(format!("{:#}", read_spec(file.path()).unwrap_err()).contains("Invalid cohort spec"));
    }
}
