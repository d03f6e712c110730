use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use captura::cli::{Cli, Command};
use captura::config::CapturaConfig;
use captura::demo::{Fixture, FixtureDirectory, SimulatedPortal};
use captura::lock::{LockBackend, MemoryLock};
use captura::orchestrator::{CaptureOrchestrator, OrchestratorSettings};
use captura::response::ApiResponse;
use captura::store::{AuditBackend, MemoryAuditStore, MemoryJobStore};
use captura::{logging, ui};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = CapturaConfig::load()?;
    cli.apply_overrides(&mut config);
    logging::init(&config.log, cli.verbose)?;

    match &cli.command {
        Command::Plan { file } => plan(&config, file).await,
        Command::Demo { file } => demo(&config, file.as_deref()).await,
    }
}

async fn plan(config: &CapturaConfig, file: &Path) -> Result<()> {
    let fixture = Fixture::load(file)?;
    let orchestrator = CaptureOrchestrator::new(
        FixtureDirectory::new(&fixture),
        SimulatedPortal::default(),
        SimulatedPortal::default(),
        MemoryLock::new(),
        MemoryAuditStore::default(),
        MemoryJobStore::default(),
        OrchestratorSettings::from(config),
    );
    let plan = orchestrator.plan(&fixture.request).await?;
    ui::print_plan(&plan);
    Ok(())
}

async fn demo(config: &CapturaConfig, file: Option<&Path>) -> Result<()> {
    let fixture = match file {
        Some(path) => Fixture::load(path)?,
        None => Fixture::embedded()?,
    };
    let lock = LockBackend::from_config(config).context("Failed to build lock client")?;
    let audit = AuditBackend::from_config(config);
    info!(
        lock = lock.name(),
        audit = %audit.describe(),
        lock_enabled = config.enable_distributed_lock,
        "Starting demo capture"
    );

    let orchestrator = CaptureOrchestrator::new(
        FixtureDirectory::new(&fixture),
        SimulatedPortal::new(fixture.portal.clone()),
        SimulatedPortal::new(fixture.portal.clone()),
        lock,
        audit,
        MemoryJobStore::default(),
        OrchestratorSettings::from(config),
    );

    let progress = ui::JobProgress::start("Capturing parties");
    let result = orchestrator.run(&fixture.request).await;
    let response = ApiResponse::from_result(&result);
    match &result {
        Ok(summary) => progress.complete(summary),
        Err(_) => progress.abort(&response),
    }
    ui::print_response(&response);

    if !response.is_success() {
        bail!("capture failed with status {}", response.status);
    }
    Ok(())
}
