//! Process entry for a coupled paleoclimate run.
//!
//! A run is parametrized by a single named variant; the variant determines
//! the config files, the bathymetry dataset directory and the file-name
//! suffix for the entire run. The process exits non-zero only when the
//! simulation+reconstruction phase fails; a degraded run (missing intervals
//! or failed maps) is reported in the log but still exits zero.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paleodrift_core::bathymetry::{BathymetryProvider, MaskVariant};
use paleodrift_core::config::{SimulationConfig, VariantRegistry};
use paleodrift_core::errors::RunError;
use paleodrift_core::maps::{MapSet, MapStage, PgmRenderer, ATM_MAP_FIELDS, HYD_MAP_FIELDS};
use paleodrift_core::orchestrator::{Orchestrator, RunReport};
use paleodrift_core::reconstruct::ReconstructionEngine;
use paleodrift_core::simulator::ProcessSimulator;

#[derive(Parser, Debug)]
#[command(name = "paleodrift")]
#[command(about = "Run a coupled atmosphere/hydrosphere simulation across geological time slices")]
struct Cli {
    /// Named configuration/dataset variant from the registry
    #[arg(default_value = "golonka")]
    variant: String,

    /// Path to the variant registry
    #[arg(long, default_value = "variants.toml")]
    registry: PathBuf,

    /// Output directory for atmosphere map artifacts
    #[arg(long, default_value = "atm_maps")]
    atm_maps: PathBuf,

    /// Output directory for hydrosphere map artifacts
    #[arg(long, default_value = "hyd_maps")]
    hyd_maps: PathBuf,

    /// Skip the map generation stage
    #[arg(long)]
    no_maps: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "paleodrift=info,paleodrift_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(report) => {
            if report.is_degraded() {
                warn!(
                    failed_intervals = report.failed_intervals.len(),
                    map_failure = report.map_failure.is_some(),
                    "run completed degraded"
                );
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("{err}");
            let mut source = std::error::Error::source(&err);
            while let Some(cause) = source {
                error!("  caused by: {cause}");
                source = cause.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<RunReport, RunError> {
    let registry = VariantRegistry::from_file(&cli.registry)?;
    let variant = registry.get(&cli.variant)?.clone();
    info!(variant = %cli.variant, "selected run variant");

    let atm_config = SimulationConfig::from_file(&variant.config_atm)?;
    let hyd_config = SimulationConfig::from_file(&variant.config_hyd)?;
    let output_dir = atm_config.output_path.clone();

    let atm = ProcessSimulator::new("atmosphere", variant.config_atm.clone(), atm_config);
    let hyd = ProcessSimulator::new("hydrosphere", variant.config_hyd.clone(), hyd_config);

    let mask_variant = MaskVariant::from_run_variant(&cli.variant, &variant);
    let engine = ReconstructionEngine::new(
        BathymetryProvider::new(mask_variant),
        &output_dir,
        &output_dir,
    );

    let mut orchestrator = Orchestrator::new(atm, hyd, engine);
    if !cli.no_maps {
        orchestrator = orchestrator.with_map_stage(MapStage::new(
            Box::new(PgmRenderer),
            vec![
                MapSet::new(ATM_MAP_FIELDS, &output_dir, &cli.atm_maps),
                MapSet::new(HYD_MAP_FIELDS, &output_dir, &cli.hyd_maps),
            ],
        ));
    }
    orchestrator.run()
}
