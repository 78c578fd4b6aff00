use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use docplan_core::{DocumentPlanner, ExtractionInput, FallbackDecision, ReconcileConfig};
use docplan_extract::UserId;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

/// Exit code when the caller should render the unstructured summary
const FALLBACK_EXIT: u8 = 2;

fn cli() -> Command {
    Command::new("docplan")
        .version(docplan_core::VERSION)
        .about("Reconcile extracted document entities into a workflow and checklist")
        .arg_required_else_help(true)
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON on stderr"),
        )
        .subcommand(
            Command::new("reconcile")
                .about("Reconcile one extraction pass and print workflow, checklist and progress")
                .arg(
                    Arg::new("input")
                        .long("input")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Extraction input JSON"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration TOML (defaults otherwise)"),
                )
                .arg(
                    Arg::new("user")
                        .long("user")
                        .value_parser(value_parser!(Uuid))
                        .help("Checklist owner (random if omitted)"),
                )
                .arg(
                    Arg::new("now")
                        .long("now")
                        .value_parser(value_parser!(DateTime<Utc>))
                        .help("Current time as RFC 3339 (system clock if omitted)"),
                ),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Configuration TOML to validate and print"),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(args: &ArgMatches) -> Result<ReconcileConfig> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => ReconcileConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(ReconcileConfig::new()),
    }
}

/// What `reconcile` produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rendered {
    Planned,
    Fallback,
}

impl Rendered {
    fn exit_code(self) -> u8 {
        match self {
            Self::Planned => 0,
            Self::Fallback => FALLBACK_EXIT,
        }
    }
}

fn reconcile(args: &ArgMatches) -> Result<(Rendered, Value)> {
    let config = load_config(args)?;
    let path = args
        .get_one::<PathBuf>("input")
        .context("--input is required")?;
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let input: ExtractionInput =
        serde_json::from_str(&text).with_context(|| format!("parsing extraction input {}", path.display()))?;

    let user_id = args.get_one::<Uuid>("user").map_or_else(UserId::new, |u| UserId(*u));
    let now = args.get_one::<DateTime<Utc>>("now").copied().unwrap_or_else(Utc::now);

    let planner = DocumentPlanner::new(config);
    match planner.ingest(input, user_id, now, &CancellationToken::new()) {
        Ok(planned) => {
            let progress = planner.progress(planned.checklist.checklist_id())?;
            let output = json!({
                "workflow": &*planned.workflow,
                "report": planned.report,
                "checklist": planned.checklist.view(),
                "progress": progress,
            });
            Ok((Rendered::Planned, output))
        }
        Err(err) => match FallbackDecision::from_error(&err) {
            Some(decision) => {
                tracing::warn!(error = %err, "structured workflow abandoned");
                Ok((Rendered::Fallback, json!({ "fallback": decision })))
            }
            None => Err(err).context("reconciliation failed"),
        },
    }
}

fn show_config(args: &ArgMatches) -> Result<ExitCode> {
    let config = load_config(args)?;
    print!("{}", config.to_toml_string()?);
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("reconcile", args)) => {
            let (rendered, output) = reconcile(args)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(ExitCode::from(rendered.exit_code()))
        }
        Some(("config", args)) => show_config(args),
        _ => Ok(ExitCode::SUCCESS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docplan_extract::DocumentId;
    use docplan_test_utils::{create_registry, create_sample_entities, create_step, reference};

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn reconcile_requires_input() {
        let result = cli().try_get_matches_from(["docplan", "reconcile"]);
        assert!(result.is_err());
    }

    #[test]
    fn parses_typed_arguments() {
        let matches = cli()
            .try_get_matches_from([
                "docplan",
                "--log-json",
                "reconcile",
                "--input",
                "batch.json",
                "--user",
                "67e55044-10b1-426f-9247-bb680e5fe0c8",
                "--now",
                "2025-01-01T09:00:00Z",
            ])
            .unwrap();
        assert!(matches.get_flag("log-json"));
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "reconcile");
        assert!(args.get_one::<Uuid>("user").is_some());
        assert_eq!(
            args.get_one::<DateTime<Utc>>("now").map(DateTime::to_rfc3339),
            Some("2025-01-01T09:00:00+00:00".to_string())
        );
    }

    fn reconcile_file(input: &ExtractionInput) -> (Rendered, Value) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer(&mut file, input).unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let matches = cli()
            .try_get_matches_from(["docplan", "reconcile", "--input", path.as_str(), "--now", "2025-01-01T09:00:00Z"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        reconcile(args).unwrap()
    }

    #[test]
    fn reconcile_prints_workflow_checklist_and_progress() {
        let input = ExtractionInput::new(
            create_registry(DocumentId::new()),
            reference(),
            create_sample_entities(),
        );
        let (rendered, output) = reconcile_file(&input);

        assert_eq!(rendered, Rendered::Planned);
        assert_eq!(rendered.exit_code(), 0);
        assert_eq!(output["workflow"]["steps"].as_array().unwrap().len(), 4);
        assert_eq!(output["workflow"]["critical_path"], json!([1, 2, 4]));
        assert_eq!(output["checklist"]["items"].as_array().unwrap().len(), 4);
        assert_eq!(output["checklist"]["items"][0]["can_complete"], json!(true));
        assert_eq!(output["progress"]["percent"], json!(0));
        assert!(output.get("fallback").is_none());
    }

    #[test]
    fn cyclic_input_renders_fallback_with_exit_code_2() {
        let input = ExtractionInput::new(
            create_registry(DocumentId::new()),
            reference(),
            vec![create_step("a", 1, &[2], 1), create_step("b", 2, &[1], 2)],
        );
        let (rendered, output) = reconcile_file(&input);

        assert_eq!(rendered, Rendered::Fallback);
        assert_eq!(rendered.exit_code(), 2);
        assert_eq!(output["fallback"]["cause"], json!("circular_dependencies"));
        assert_eq!(output["fallback"]["cycle_path"], json!([1, 2, 1]));
        assert!(output.get("workflow").is_none());
    }

    #[test]
    fn unreadable_input_is_an_error_not_a_fallback() {
        let matches = cli()
            .try_get_matches_from(["docplan", "reconcile", "--input", "/nonexistent/batch.json"])
            .unwrap();
        let (_, args) = matches.subcommand().unwrap();
        let err = reconcile(args).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }
}
