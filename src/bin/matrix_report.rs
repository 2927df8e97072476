//! Print a relationship matrix
//!
//! Loads an iteration and the plugin settings from JSON, applies one of the saved
//! configurations and prints the resulting grid.
//!
//! ```text
//! matrix-report <iteration.json> <settings.json> <configuration> [--json]
//! ```

use anyhow::{bail, Context, Result};
use relationship_matrix::{
    InMemorySession, IterationData, PluginSettings, RelationshipMatrix, Session, StaticPermissionService,
};
use std::fs;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    let positional: Vec<&String> = args.iter().filter(|a| !a.starts_with("--")).collect();
    let [iteration_path, settings_path, name] = positional.as_slice() else {
        bail!("usage: matrix-report <iteration.json> <settings.json> <configuration> [--json]");
    };

    let content = fs::read_to_string(iteration_path)
        .with_context(|| format!("reading iteration from {iteration_path}"))?;
    let data: IterationData = serde_json::from_str(&content).context("parsing iteration")?;
    let settings = PluginSettings::load(settings_path)?;
    let configuration = settings.configuration(name)?;

    let session = Arc::new(InMemorySession::from_data(data));
    let iteration = session.iteration_id();
    let things = session.things(iteration, &relationship_matrix::ClassKind::ALL).len();
    info!(%iteration, things, configuration = %configuration.name, "Iteration loaded");

    let mut matrix = RelationshipMatrix::new(
        session,
        Arc::new(StaticPermissionService::allow_all()),
        iteration,
        &settings,
    );
    matrix.load_configuration(configuration);

    let export = matrix.export();
    if export.is_empty() {
        info!(title = %export.title, "Matrix is empty for this configuration");
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&export)?);
    } else {
        print!("{}", export.to_text());
    }

    Ok(())
}
