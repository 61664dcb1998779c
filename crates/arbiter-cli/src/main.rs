use anyhow::{Context, Result};
use arbiter_cli::{
    apply_env_overrides, build_cli, describe_error, load_documents, render_outcome,
    render_transitions, resolve_config, EXIT_PIPELINE_ERROR,
};
use arbiter_core::{CommandGenerator, KeywordIndex, Orchestrator, RetryingGenerator};
use clap::ArgMatches;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "arbiter=debug" } else { "arbiter=info" };
    let filter = if verbose {
        EnvFilter::new(default)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn submit(args: &ArgMatches) -> Result<i32> {
    let query = args
        .get_one::<String>("query")
        .context("--query is required")?;
    let documents_path = args
        .get_one::<PathBuf>("documents")
        .context("--documents is required")?;

    let config = resolve_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let mut config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    if let Some(command) = args.get_one::<String>("generator-cmd") {
        config.generation.command = Some(command.clone());
    }

    let documents = load_documents(documents_path)?;
    tracing::info!(documents = documents.len(), "loaded documents");

    let retriever = Arc::new(KeywordIndex::from_documents(&documents));
    let command = CommandGenerator::from_config(&config.generation)
        .context("no usable generator command; pass --generator-cmd or set generation.command")?;
    let generator = Arc::new(RetryingGenerator::from_config(
        Arc::new(command),
        &config.generation,
    ));

    let orchestrator = Orchestrator::new(config, retriever, generator)?;
    let outcome = orchestrator.submit(query, documents).await?;

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print!("{}", render_outcome(&outcome));
    }

    if outcome.is_complete() {
        Ok(0)
    } else {
        if let Some(error) = &outcome.error {
            tracing::warn!("{}", describe_error(error));
        }
        Ok(EXIT_PIPELINE_ERROR)
    }
}

fn show_config(args: &ArgMatches) -> Result<()> {
    let config = resolve_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
    let config = apply_env_overrides(config, |key| std::env::var(key).ok())?;
    print!("{}", toml::to_string_pretty(&config).context("render configuration")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = build_cli().get_matches();
    init_tracing(matches.get_flag("verbose"), matches.get_flag("log-json"));

    match matches.subcommand() {
        Some(("submit", args)) => {
            let code = submit(args).await?;
            std::process::exit(code);
        }
        Some(("transitions", _)) => print!("{}", render_transitions()),
        Some(("config", args)) => show_config(args)?,
        _ => {}
    }
    Ok(())
}
