//! Arbiter CLI
//!
//! Command definition, document loading and output rendering for the
//! `arbiter` binary.

#![warn(missing_docs)]

use anyhow::{bail, Context, Result};
use arbiter_core::{PipelineConfig, SubmitOutcome};
use arbiter_kernel::{allowed_transitions, ErrorContext, Step};
use arbiter_model::Document;
use clap::{value_parser, Arg, ArgAction, Command};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Overrides `retrieval.top_k`
pub const ENV_TOP_K: &str = "ARBITER_TOP_K";
/// Overrides `generation.command`
pub const ENV_GENERATOR_CMD: &str = "ARBITER_GENERATOR_CMD";

/// Exit code of a run that ended in `error`
pub const EXIT_PIPELINE_ERROR: i32 = 2;

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("Path to a TOML configuration file")
}

/// The `arbiter` command tree
#[must_use]
pub fn build_cli() -> Command {
    Command::new("arbiter")
        .version(arbiter_core::VERSION)
        .about("Decision support: retrieve options, weigh pros and cons, rank a recommendation")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("submit")
                .about("Run the pipeline for a query over a document file")
                .arg(
                    Arg::new("query")
                        .long("query")
                        .short('q')
                        .required(true)
                        .help("The decision question"),
                )
                .arg(
                    Arg::new("documents")
                        .long("documents")
                        .short('d')
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON array or JSON Lines file of {\"content\", \"metadata\"} records"),
                )
                .arg(config_arg())
                .arg(
                    Arg::new("generator-cmd")
                        .long("generator-cmd")
                        .help("Command the prompts are piped into, e.g. \"llm -m gemini-2.5-flash\""),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print the outcome as JSON"),
                ),
        )
        .subcommand(Command::new("transitions").about("Print the workflow transition table"))
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration")
                .arg(config_arg()),
        )
}

/// Configuration from `path`, or the defaults when no file is given
///
/// # Errors
/// Fails if the file cannot be read, parsed or validated
pub fn resolve_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => arbiter_core::load_config(path)
            .with_context(|| format!("load configuration from {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

/// Apply environment overrides read through `lookup`
///
/// # Errors
/// Fails if an override does not parse or the result does not validate
pub fn apply_env_overrides<F>(mut config: PipelineConfig, lookup: F) -> Result<PipelineConfig>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(ENV_TOP_K) {
        let top_k = raw
            .trim()
            .parse::<usize>()
            .with_context(|| format!("{ENV_TOP_K} must be a positive integer, got {raw:?}"))?;
        config.retrieval.top_k = top_k;
    }
    if let Some(command) = lookup(ENV_GENERATOR_CMD) {
        if !command.trim().is_empty() {
            config.generation.command = Some(command);
        }
    }
    config.validate().context("invalid configuration after environment overrides")?;
    Ok(config)
}

/// Parse documents from a JSON array or JSON Lines text
///
/// # Errors
/// Fails on malformed JSON or a record that is not a valid document
pub fn parse_documents(text: &str) -> Result<Vec<Document>> {
    let documents: Vec<Document> = if text.trim_start().starts_with('[') {
        serde_json::from_str(text).context("parse JSON document array")?
    } else {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).with_context(|| format!("parse document on line {}", i + 1))
            })
            .collect::<Result<_>>()?
    };
    if documents.is_empty() {
        bail!("no documents found");
    }
    Ok(documents)
}

/// Read and parse a document file
///
/// # Errors
/// Fails if the file cannot be read or parsed
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read documents from {}", path.display()))?;
    parse_documents(&text).with_context(|| format!("load documents from {}", path.display()))
}

/// The transition table, one source step per line
#[must_use]
pub fn render_transitions() -> String {
    let mut out = String::new();
    for step in Step::ALL {
        let targets: Vec<_> = allowed_transitions(step).iter().map(|s| s.as_str()).collect();
        let targets = if targets.is_empty() {
            "(none)".to_string()
        } else {
            targets.join(", ")
        };
        let _ = writeln!(out, "{:<14} -> {targets}", step.as_str());
    }
    out
}

/// Human-readable ranking
#[must_use]
pub fn render_outcome(outcome: &SubmitOutcome) -> String {
    let mut out = String::new();
    if outcome.recommendations.is_empty() {
        let _ = writeln!(out, "No recommendations.");
    } else {
        let _ = writeln!(out, "{:<5} {:>6}  Option", "Rank", "Score");
        for rec in &outcome.recommendations {
            let _ = writeln!(
                out,
                "{:<5} {:>6.2}  {} ({})",
                rec.rank(),
                rec.score(),
                rec.option().title(),
                rec.option().id()
            );
            for line in rec.reasoning().lines().filter(|l| !l.trim().is_empty()) {
                let _ = writeln!(out, "{:<14}{}", "", line.trim());
            }
        }
    }
    if let Some(error) = &outcome.error {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", describe_error(error));
    }
    out
}

/// One-line description of a failure
#[must_use]
pub fn describe_error(error: &ErrorContext) -> String {
    format!(
        "Pipeline stopped in `{}` ({}): {}",
        error.step().map_or("unknown", Step::as_str),
        error.error_type().unwrap_or("error"),
        error.cause().unwrap_or("no cause recorded")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli().debug_assert();
    }

    #[test]
    fn parses_json_array_and_lines() {
        let array = r#"[{"content": "Bond fund", "metadata": {"id": "bonds"}}, {"content": "Index fund"}]"#;
        let docs = parse_documents(array).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].metadata_str("id"), Some("bonds"));

        let lines = "{\"content\": \"Bond fund\"}\n\n{\"content\": \"Index fund\"}\n";
        assert_eq!(parse_documents(lines).unwrap().len(), 2);
    }

    #[test]
    fn rejects_invalid_documents() {
        assert!(parse_documents(r#"[{"content": "   "}]"#).is_err());
        assert!(parse_documents("[]").is_err());
        let err = parse_documents("{\"content\": \"ok\"}\nnot json\n").unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn env_overrides_apply() {
        let config = apply_env_overrides(PipelineConfig::default(), |key| match key {
            ENV_TOP_K => Some("2".into()),
            ENV_GENERATOR_CMD => Some("llm -m test".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.retrieval.top_k, 2);
        assert_eq!(config.generation.command.as_deref(), Some("llm -m test"));
    }

    #[test]
    fn bad_env_override_fails() {
        let lookup = |key: &str| (key == ENV_TOP_K).then(|| "zero".to_string());
        assert!(apply_env_overrides(PipelineConfig::default(), lookup).is_err());
        let lookup = |key: &str| (key == ENV_TOP_K).then(|| "0".to_string());
        assert!(apply_env_overrides(PipelineConfig::default(), lookup).is_err());
    }

    #[test]
    fn transition_table_rendering() {
        let table = render_transitions();
        assert!(table.contains("option_finder  -> pros_cons, error"));
        assert!(table.contains("complete       -> (none)"));
        assert_eq!(table.lines().count(), 5);
    }

    #[test]
    fn error_description() {
        let ctx = ErrorContext::stage_failure(Step::Decision, "generation_error", "timed out");
        assert_eq!(
            describe_error(&ctx),
            "Pipeline stopped in `decision` (generation_error): timed out"
        );
    }
}
