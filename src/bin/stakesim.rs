//! Stakesim CLI binary.
//!
//! Stakeholder tick simulation host.
//!
//! # Commands
//!
//! - `run` - Create (or resume) a simulation and drive it to completion
//! - `list` - List stored simulations
//! - `report` - Print the end-of-run report of a stored simulation
//!
//! During `run`, Ctrl-C pauses, a second Ctrl-C stops, and a Ctrl-C while
//! paused resumes.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use stakesim::{
    reasoning, storage, Config, EventKind, RunReport, SimulationEntity, Stage, Storage,
    TickScheduler, VERSION,
};

#[derive(Parser)]
#[command(name = "stakesim")]
#[command(version = VERSION)]
#[command(about = "Stakeholder tick simulation for startup ventures", long_about = None)]
struct Cli {
    /// Config file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation
    Run {
        /// Venture name
        #[arg(short, long, default_value = "Untitled Venture")]
        name: String,

        /// Industry label
        #[arg(short, long, default_value = "technology")]
        industry: String,

        /// Starting stage (idea, mvp, launch, growth, scale, exit)
        #[arg(short, long, default_value = "mvp")]
        stage: String,

        /// Venture description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Stop after this many ticks
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Reasoning provider (mock, openai)
        #[arg(long)]
        provider: Option<String>,

        /// Ticks per wall-clock second (0 = unpaced)
        #[arg(long)]
        speed: Option<f64>,

        /// Random event seed
        #[arg(long)]
        seed: Option<u64>,

        /// Resume a stored simulation from its checkpoint
        #[arg(long)]
        resume: Option<String>,

        /// Keep everything in memory
        #[arg(long)]
        memory: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List stored simulations
    List,

    /// Print the report of a stored simulation
    Report {
        /// Simulation id
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();

    match cli.command {
        Commands::Run {
            name,
            industry,
            stage,
            description,
            ticks,
            provider,
            speed,
            seed,
            resume,
            memory,
            json,
        } => {
            let mut config = config;
            if let Some(provider) = provider {
                config.reasoning.provider = provider;
            }
            if let Some(speed) = speed {
                config.scheduler.speed_multiplier = speed;
            }
            if seed.is_some() {
                config.scheduler.seed = seed;
            }
            if memory {
                config.storage.backend = "memory".to_string();
            }
            let stage: Stage = stage.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let venture = SimulationEntity::new(name, industry, stage).with_description(description);
            cmd_run(config, venture, resume, ticks, json).await
        },
        Commands::List => cmd_list(&config),
        Commands::Report { id, json } => cmd_report(&config, &id, json),
    }
}

async fn cmd_run(
    config: Config,
    venture: SimulationEntity,
    resume: Option<String>,
    ticks: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let store = storage::open(&config.storage)?;
    let provider = reasoning::build(&config.reasoning, &config.resilience, config.scheduler.seed)?;

    let mut scheduler = match resume {
        Some(id) => TickScheduler::open(&id, config.clone(), store, provider)?,
        None => {
            let mut scheduler = TickScheduler::create(venture, config.clone(), store, provider)?;
            let spawned = scheduler.spawn_default_roster()?;
            tracing::info!(actors = spawned, "Roster spawned");
            scheduler
        },
    };

    let progress_every = config.scheduler.metrics_interval.max(1);
    scheduler.bus().subscribe(EventKind::Tick, move |event| {
        let tick = event.payload["tick"].as_u64().unwrap_or(0);
        if tick % progress_every == 0 {
            let date = event.payload["date"].as_str().unwrap_or_default();
            tracing::info!(tick, %date, "Progress");
        }
        Ok(())
    });
    scheduler.bus().subscribe(EventKind::PhaseTransition, |event| {
        tracing::info!(from = %event.payload["from"], to = %event.payload["to"], "Stage changed");
        Ok(())
    });

    let control = scheduler.control();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !control.interrupt() {
                break;
            }
        }
    });

    tracing::info!(
        simulation = %scheduler.simulation().id,
        name = %scheduler.simulation().name,
        "Starting run (Ctrl-C to pause, twice to stop)"
    );
    let report = scheduler.run(ticks).await?;
    print_report(&report, json)?;
    if report.outcome.is_failed() {
        std::process::exit(2);
    }
    Ok(())
}

fn cmd_list(config: &Config) -> anyhow::Result<()> {
    let store = storage::open(&config.storage)?;
    let simulations = store.list_simulations()?;
    if simulations.is_empty() {
        println!("No simulations stored in {}", config.storage.data_dir.display());
        return Ok(());
    }
    println!("{:<38} {:<24} {:<16} {}", "ID", "NAME", "INDUSTRY", "STAGE");
    for sim in simulations {
        println!(
            "{:<38} {:<24} {:<16} {}",
            sim.id, sim.name, sim.industry, sim.stage
        );
    }
    Ok(())
}

fn cmd_report(config: &Config, id: &str, json: bool) -> anyhow::Result<()> {
    let store = storage::open(&config.storage)?;
    let report = RunReport::from_storage(store.as_ref(), id)?;
    print_report(&report, json)
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        print!("{}", report.render());
    }
    Ok(())
}
