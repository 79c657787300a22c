//! CLI subcommand implementations for specimen

pub mod generate;
pub mod inspect;
pub mod output;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use specimen::TypeModel;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber. `RUST_LOG` wins over the default level.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read and parse a JSON type schema.
pub fn load_schema(path: &Path) -> Result<Arc<TypeModel>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schema {}", path.display()))?;
    let model = TypeModel::from_json(&text)
        .with_context(|| format!("Invalid schema {}", path.display()))?;
    let missing = model.undefined_references();
    if !missing.is_empty() {
        warn!(types = %missing.join(", "), "schema references undefined types");
    }
    Ok(Arc::new(model))
}
