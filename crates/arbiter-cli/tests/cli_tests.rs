use arbiter_cli::{build_cli, load_documents, render_outcome, resolve_config};
use arbiter_core::{KeywordIndex, Orchestrator, PipelineConfig, SubmitOutcome};
use arbiter_kernel::{AgentState, ErrorContext, Step};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;

#[test]
fn test_submit_arguments_parse() {
    let matches = build_cli()
        .try_get_matches_from([
            "arbiter",
            "submit",
            "--query",
            "Find best investment option",
            "--documents",
            "docs.jsonl",
            "--generator-cmd",
            "llm -m test",
            "--json",
            "-v",
        ])
        .unwrap();
    let (name, args) = matches.subcommand().unwrap();
    assert_eq!(name, "submit");
    assert_eq!(
        args.get_one::<String>("query").map(String::as_str),
        Some("Find best investment option")
    );
    assert!(args.get_flag("json"));
}

#[test]
fn test_submit_requires_query_and_documents() {
    assert!(build_cli().try_get_matches_from(["arbiter", "submit"]).is_err());
    assert!(build_cli().try_get_matches_from(["arbiter"]).is_err());
}

#[test]
fn test_load_documents_from_jsonl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("docs.jsonl");
    fs::write(
        &path,
        "{\"content\": \"Government bond fund, low risk\", \"metadata\": {\"id\": \"bonds\"}}\n\
         {\"content\": \"Stock index fund\", \"metadata\": {\"id\": \"index\", \"title\": \"Index fund\"}}\n",
    )
    .unwrap();

    let docs = load_documents(&path).unwrap();
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[1].metadata_str("title"), Some("Index fund"));
    assert_eq!(KeywordIndex::from_documents(&docs).len(), 2);
}

#[test]
fn test_missing_document_file_fails() {
    let err = load_documents(Path::new("/nonexistent/docs.json")).unwrap_err();
    assert!(format!("{err:#}").contains("read documents"));
}

#[test]
fn test_resolve_config() {
    assert_eq!(resolve_config(None).unwrap(), PipelineConfig::default());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arbiter.toml");
    fs::write(&path, "[decision]\nmax_recommendations = 0\n").unwrap();
    assert!(resolve_config(Some(path.as_path())).is_err());
}

#[test]
fn test_render_failed_outcome() {
    let docs = load_inline(r#"[{"content": "Bond fund"}]"#);
    let state = AgentState::create("q", docs)
        .unwrap()
        .fail(ErrorContext::stage_failure(Step::OptionFinder, "retrieval_error", "index offline"));
    let text = render_outcome(&SubmitOutcome::from_state(&state));
    assert!(text.contains("No recommendations."));
    assert!(text.contains("Pipeline stopped in `option_finder` (retrieval_error): index offline"));
}

#[test]
fn test_orchestrator_accepts_cli_config() {
    let config = arbiter_cli::apply_env_overrides(PipelineConfig::default(), |_| None).unwrap();
    let docs = load_inline(r#"[{"content": "Bond fund"}]"#);
    let index = std::sync::Arc::new(KeywordIndex::from_documents(&docs));
    let generator = std::sync::Arc::new(
        arbiter_core::CommandGenerator::new("cat", std::time::Duration::from_secs(1)).unwrap(),
    );
    assert!(Orchestrator::new(config, index, generator).is_ok());
}

fn load_inline(json: &str) -> Vec<arbiter_model::Document> {
    arbiter_cli::parse_documents(json).unwrap()
}
