use arbiter_core::config::{load_config, PipelineConfig};
use arbiter_core::PipelineError;
use pretty_assertions::assert_eq;
use std::fs;

#[test]
fn test_load_full_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("arbiter.toml");
    fs::write(
        &path,
        r#"
[retrieval]
top_k = 3
min_similarity = 0.2

[generation]
command = "llm -m gemini-2.5-flash"
timeout_secs = 30
max_retries = 2
retry_delay_ms = 500
max_retry_delay_ms = 4000

[analysis]
concurrency = 4
default_confidence = 6.0

[decision]
min_score = 1.0
max_recommendations = 2
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();
    assert_eq!(config.retrieval.top_k, 3);
    assert_eq!(config.generation.command.as_deref(), Some("llm -m gemini-2.5-flash"));
    assert_eq!(config.generation.timeout().as_secs(), 30);
    assert_eq!(config.generation.max_retry_delay().as_millis(), 4000);
    assert_eq!(config.analysis.concurrency, 4);
    assert_eq!(config.decision.max_recommendations, 2);
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.toml");
    fs::write(&path, "").unwrap();
    assert_eq!(load_config(&path).unwrap(), PipelineConfig::default());
}

#[test]
fn test_invalid_values_rejected() {
    let dir = tempfile::tempdir().unwrap();
    for (name, body) in [
        ("top_k.toml", "[retrieval]\ntop_k = 0\n"),
        ("similarity.toml", "[retrieval]\nmin_similarity = 2.0\n"),
        ("confidence.toml", "[analysis]\ndefault_confidence = 11.0\n"),
        ("cap.toml", "[decision]\nmax_recommendations = 0\n"),
        ("delay.toml", "[generation]\nretry_delay_ms = 9000\nmax_retry_delay_ms = 10\n"),
    ] {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)), "{name}: {err}");
    }
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("failed to read config file"));
}
