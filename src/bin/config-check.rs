//! # Configuration Checker
//!
//! Command-line tool that loads the layered server core configuration,
//! validates it and prints the effective values.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use a2a_core::config::ConfigLoader;

#[derive(Parser)]
#[command(name = "config-check")]
#[command(about = "Validate A2A core configuration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// TOML file to load (defaults to A2A_CORE_CONFIG_PATH when set)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Summary,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .try_init();

    match run(&cli) {
        Ok(()) => {
            info!("Configuration validation completed successfully");
        }
        Err(e) => {
            error!("Configuration validation failed: {:#}", e);
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_file(path);
    }
    let config = loader.load().context("loading configuration")?;

    match cli.format {
        OutputFormat::Json => {
            let rendered =
                serde_json::to_string_pretty(&config).context("rendering configuration")?;
            println!("{rendered}");
        }
        OutputFormat::Summary => {
            println!(
                "agent completion timeout: {:?}",
                config.orchestration.agent_completion_timeout()
            );
            println!(
                "consumption completion timeout: {:?}",
                config.orchestration.consumption_completion_timeout()
            );
            println!("default blocking: {}", config.orchestration.default_blocking);
            println!("queue poll interval: {:?}", config.queue.poll_interval());
            println!(
                "log level: {}",
                config.logging.level.as_deref().unwrap_or("(environment default)")
            );
            println!("json logs: {}", config.logging.json);
        }
    }
    Ok(())
}
