//! fedrl - federated learning tuned by a reinforcement learning agent
//!
//! CLI entry point for running campaigns and inspecting configuration.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use eyre::{Context, Result};
use tracing::info;

use fedrl::cli::{Cli, Command, RunArgs, get_log_path};
use fedrl::config::Config;
use fedrl::server;

fn setup_logging(verbose: bool, log_stderr: bool) -> Result<()> {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    if log_stderr {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        // Create log directory
        let log_path = get_log_path();
        let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

        // Write to log file, not stdout/stderr
        let log_file = fs::File::create(&log_path).context("Failed to create log file")?;
        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_ansi(false)
            .with_env_filter(filter)
            .init();
    }

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.log_stderr).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(
        "fedrl loaded config: fl-server={}, episodes={}",
        config.rl.fl_server, config.rl.episodes
    );

    match cli.command {
        Some(Command::Run(args)) => cmd_run(config, &args).await,
        Some(Command::Config) => cmd_config(&config),
        Some(Command::Validate) => cmd_validate(&config),
        None => cmd_run(config, &RunArgs::default()).await,
    }
}

/// Run a campaign and print its summary
async fn cmd_run(mut config: Config, args: &RunArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    let report = server::run_campaign(&config).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary);
        if let Some(best) = report.agent.best_episode() {
            println!(
                "  best episode reward: {:.4} (episode {})",
                best.total_reward,
                best.episode + 1
            );
        }
    }
    Ok(())
}

/// Print the resolved configuration
fn cmd_config(config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}

/// Validate the configuration
fn cmd_validate(config: &Config) -> Result<()> {
    config.validate()?;
    println!("Configuration OK");
    Ok(())
}
