//! Inicialização do subscriber de `tracing`.
//!
//! `RUST_LOG` tem precedência; sem ele vale o nível de [`LogConfig`], ou
//! `debug` quando a CLI recebe `--verbose`. Logs vão para stderr para não
//! misturar com o resumo JSON impresso em stdout.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::LogConfig;

/// Builds the filter directive for the given config and verbosity.
pub fn default_directive(config: &LogConfig, verbose: bool) -> String {
    let level = if verbose { "debug" } else { config.level.as_str() };
    format!("captura={level},warn")
}

pub fn init(config: &LogConfig, verbose: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(config, verbose))
            .context("Failed to parse log filter directive")?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {e}"))
}
