//! conductor - cross-system orchestration daemon and definition tooling
//!
//! # Commands
//!
//! - `conductor run -f home.toml`: start the core with its periodic cycles
//!   and log every outbound action until Ctrl-C
//! - `conductor check home.toml`: validate a definitions file
//! - `conductor startup-order home.toml`: print systems in boot order
//! - `conductor config`: print the resolved configuration
//!
//! # Configuration
//!
//! Configuration is loaded from multiple sources with priority:
//!
//! 1. CLI arguments (highest priority)
//! 2. Environment variables (`CONDUCTOR_*`)
//! 3. Project config (`.conductor/config.toml` in the project root)
//! 4. Global config (`~/.conductor/config.toml`)
//! 5. Default values (lowest priority)
//!
//! # Logging
//!
//! Terminal filter: `--debug` > `--verbose` > `RUST_LOG` > `warn`.
//! `--log-file` adds an independent append-only layer at `debug`.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use conductor_event::ConductorEvent;
use conductor_runtime::rules::ClockContextProvider;
use conductor_runtime::{
    ConductorConfig, ConductorEngine, ConfigError, ConfigLoader, ConfigResolver, Definitions,
    EngineError, LoggingDispatcher,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// conductor - cross-system orchestration core
#[derive(Parser, Debug)]
#[command(name = "conductor")]
#[command(version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Project root directory (defaults to current directory)
    #[arg(short = 'C', long, global = true)]
    project: Option<PathBuf>,

    /// Skip ~/.conductor/config.toml
    #[arg(long, global = true)]
    no_global_config: bool,

    /// Append debug logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Override queue.max_depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Override rules.confidence_threshold
    #[arg(long, global = true)]
    confidence_threshold: Option<f64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the orchestration core until Ctrl-C
    Run {
        /// Definitions file (systems, conflicts, rules, scenarios)
        #[arg(short = 'f', long)]
        definitions: Option<PathBuf>,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long, value_name = "SECS")]
        duration: Option<u64>,
    },
    /// Validate a definitions file
    Check {
        /// Definitions file
        file: PathBuf,
    },
    /// Print registered systems, dependencies before dependents
    StartupOrder {
        /// Definitions file
        file: PathBuf,
    },
    /// Print the resolved configuration as TOML
    Config,
}

/// CLI-based configuration resolver.
///
/// Loads file/env config via [`ConfigLoader`] and applies CLI argument
/// overrides as the highest-priority layer.
struct CliConfigResolver {
    project_root: PathBuf,
    skip_global: bool,
    max_depth: Option<usize>,
    confidence_threshold: Option<f64>,
}

impl CliConfigResolver {
    fn from_args(args: &Args) -> Self {
        let project_root = args.project.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|e| {
                warn!(error = %e, "failed to get current directory, using '.'");
                PathBuf::from(".")
            })
        });

        Self {
            project_root,
            skip_global: args.no_global_config,
            max_depth: args.max_depth,
            confidence_threshold: args.confidence_threshold,
        }
    }

    fn resolve(&self) -> Result<ConductorConfig, ConfigError> {
        let mut loader = ConfigLoader::new().with_project_root(&self.project_root);
        if self.skip_global {
            loader = loader.skip_global_config();
        }
        let mut config = loader.load()?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

impl ConfigResolver for CliConfigResolver {
    fn apply(&self, config: &mut ConductorConfig) {
        if let Some(depth) = self.max_depth {
            config.queue.max_depth = depth;
        }
        if let Some(threshold) = self.confidence_threshold {
            config.rules.confidence_threshold = threshold;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    let resolver = CliConfigResolver::from_args(&args);
    let config = resolver
        .resolve()
        .map_err(|e| anyhow::anyhow!("Config error: {e}"))?;
    debug!(project = %resolver.project_root.display(), "configuration resolved");

    match args.command {
        Command::Run {
            definitions,
            duration,
        } => run(config, definitions.as_deref(), duration.map(Duration::from_secs)).await,
        Command::Check { file } => check(config, &file),
        Command::StartupOrder { file } => startup_order(config, &file),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_tracing(args: &Args) -> Result<()> {
    let terminal_filter = if args.debug {
        EnvFilter::new("debug")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let terminal_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(terminal_filter);

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file))
                    .with_filter(EnvFilter::new("debug")),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(terminal_layer)
        .with(file_layer)
        .init();
    Ok(())
}

/// Builds an engine from a definitions file.
///
/// Systems go through the strict registration path so a bad entry
/// fails the command instead of being skipped.
fn build_engine(
    config: ConductorConfig,
    mut definitions: Definitions,
) -> Result<ConductorEngine, EngineError> {
    let systems = std::mem::take(&mut definitions.systems);
    let engine = ConductorEngine::builder()
        .config(config)
        .dispatcher(Arc::new(LoggingDispatcher))
        .definitions(definitions)
        .build();
    for system in systems {
        engine.try_register_system(system)?;
    }
    Ok(engine)
}

fn load_engine(config: ConductorConfig, file: &Path) -> Result<ConductorEngine> {
    let definitions = Definitions::load(file)?;
    info!(file = %file.display(), summary = %definitions.summary(), "definitions loaded");
    Ok(build_engine(config, definitions)?)
}

fn check(config: ConductorConfig, file: &Path) -> Result<()> {
    let definitions = Definitions::load(file)?;
    let summary = definitions.summary();
    let engine = build_engine(config, definitions)?;
    let plan = engine.startup_plan();
    println!("{}: ok ({summary})", file.display());
    for edge in &plan.cycle_edges {
        println!(
            "warning: dependency cycle through {} -> {}",
            edge.dependent, edge.dependency
        );
    }
    Ok(())
}

fn startup_order(config: ConductorConfig, file: &Path) -> Result<()> {
    let engine = load_engine(config, file)?;
    for (i, name) in engine.startup_order().iter().enumerate() {
        println!("{:>3}. {name}", i + 1);
    }
    Ok(())
}

async fn run(config: ConductorConfig, definitions: Option<&Path>, duration: Option<Duration>) -> Result<()> {
    let engine = match definitions {
        Some(file) => load_engine(config, file)?,
        None => build_engine(config, Definitions::default())?,
    };

    println!("conductor v{}", env!("CARGO_PKG_VERSION"));
    println!(
        "{} systems, {} rules, {} scenarios",
        engine.systems().len(),
        engine.rules().len(),
        engine.scenarios().len()
    );

    let observer = tokio::spawn(observe(engine.subscribe()));
    let cycles = engine.spawn_cycles(Arc::new(ClockContextProvider));
    info!(cycles = ?cycles.names(), "orchestration started");

    match duration {
        Some(limit) => {
            tokio::select! {
                _ = tokio::time::sleep(limit) => info!("run duration elapsed"),
                signal = tokio::signal::ctrl_c() => signal.context("failed to listen for Ctrl-C")?,
            }
        }
        None => tokio::signal::ctrl_c()
            .await
            .context("failed to listen for Ctrl-C")?,
    }

    cycles.shutdown();
    observer.abort();

    println!(
        "stopped: {} queued, {} dead letters, {} decisions, threshold {:.3}",
        engine.queue_depth(),
        engine.dead_letters().len(),
        engine.recent_decisions(usize::MAX).len(),
        engine.confidence_threshold()
    );
    Ok(())
}

/// Logs every event the core publishes until the bus closes.
async fn observe(mut rx: broadcast::Receiver<ConductorEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => info!(
                category = event.category().name(),
                system = event.system().unwrap_or("-"),
                ?event,
                "event"
            ),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "event observer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
