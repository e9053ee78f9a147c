use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use octofhir_cohort::{CohortRequest, TranslationOptions};

#[derive(Parser)]
#[command(name = "octofhir-cohort")]
#[command(about = "Resolve natural-language cohort descriptions against a FHIR server")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the config file (defaults to ./octofhir-cohort.toml)
    #[arg(short, long, global = true, env = "OCTOFHIR_COHORT_CONFIG")]
    pub config: Option<String>,

    /// FHIR base URL (overrides fhir.base_url)
    #[arg(long, global = true)]
    pub fhir_url: Option<String>,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Table,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate a description and resolve it to a patient cohort
    Resolve(ResolveArgs),
    /// Translate a description into queries without running them
    Translate(TranslationArgs),
    /// Resolve a saved cohort spec (JSON) without translation
    Execute(ExecuteArgs),
}

#[derive(clap::Args)]
pub struct TranslationArgs {
    /// Free-text cohort description
    pub text: String,
    /// Ask for a rationale per query
    #[arg(long)]
    pub include_rationale: bool,
    /// Ask for the extracted codes per query
    #[arg(long)]
    pub include_extract_results: bool,
    /// Do not add the query that removes deceased patients
    #[arg(long)]
    pub keep_deceased: bool,
    /// SQL dialect for the informational SQL rendering
    #[arg(long)]
    pub sql_syntax: Option<String>,
}

impl TranslationArgs {
    pub fn request(&self) -> CohortRequest {
        CohortRequest::new(self.text.clone()).with_options(TranslationOptions {
            include_extract_results: self.include_extract_results,
            include_rationale: self.include_rationale,
            exclude_deceased: !self.keep_deceased,
            sql_syntax: self.sql_syntax.clone(),
        })
    }
}

#[derive(clap::Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub translation: TranslationArgs,
    /// Store the resulting Group on the FHIR server
    #[arg(long)]
    pub persist: bool,
}

#[derive(clap::Args)]
pub struct ExecuteArgs {
    /// Path to a cohort spec JSON file ({"queries": [...], "cohortDescription": ...})
    #[arg(long)]
    pub spec: PathBuf,
    /// Store the resulting Group on the FHIR server
    #[arg(long)]
    pub persist: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_flags_map_to_request() {
        let cli = Cli::try_parse_from([
            "octofhir-cohort",
            "resolve",
            "women over 40",
            "--include-rationale",
            "--keep-deceased",
            "--sql-syntax",
            "bigquery",
            "--persist",
        ])
        .unwrap();
        let Commands::Resolve(args) = cli.command else {
            panic!("expected resolve");
        };
        assert!(args.persist);
        let request = args.translation.request();
        assert_eq!(request.text, "women over 40");
        assert!(request.config.include_rationale);
        assert!(!request.config.include_extract_results);
        assert!(!request.config.exclude_deceased);
        assert_eq!(request.config.sql_syntax.as_deref(), Some("bigquery"));
    }

    #[test]
    fn test_execute_requires_spec() {
        assert!(Cli::try_parse_from(["octofhir-cohort", "execute"]).is_err());
        let cli = Cli::try_parse_from([
            "octofhir-cohort",
            "--format",
            "table",
            "execute",
            "--spec",
            "cohort.json",
        ])
        .unwrap();
        assert!(matches!(cli.format, Some(OutputFormat::Table)));
    }
}
