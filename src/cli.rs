//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

/// fedrl - federated learning tuned by a reinforcement learning agent
#[derive(Parser)]
#[command(
    name = "fedrl",
    about = "Federated learning server whose per-round parameter is tuned by an RL agent",
    version,
    after_help = "Logs are written to: ~/.local/share/fedrl/logs/fedrl.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Write logs to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run a campaign against the simulated federation
    Run(RunArgs),

    /// Print the resolved configuration as YAML
    Config,

    /// Check the configuration and exit
    Validate,
}

/// Overrides applied on top of the loaded configuration
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Number of RL episodes
    #[arg(short, long)]
    pub episodes: Option<u32>,

    /// FL round budget per episode
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// Accuracy that ends an episode early
    #[arg(short = 'a', long)]
    pub target_accuracy: Option<f64>,

    /// Seed for the random agent and the simulated federation
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Print the summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl RunArgs {
    /// Apply the overrides that were given
    pub fn apply(&self, config: &mut Config) {
        if let Some(episodes) = self.episodes {
            config.rl.episodes = episodes;
        }
        if let Some(rounds) = self.rounds {
            config.training.rounds = Some(rounds);
        }
        if let Some(target) = self.target_accuracy {
            config.training.target_accuracy = Some(target);
        }
        if let Some(seed) = self.seed {
            config.rl.seed = Some(seed);
        }
    }
}

/// Path of the log file written by `fedrl`
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("fedrl")
        .join("logs")
        .join("fedrl.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["fedrl"]);
        assert!(cli.command.is_none());
        assert!(!cli.log_stderr);
    }

    #[test]
    fn test_cli_parse_run_defaults() {
        let cli = Cli::parse_from(["fedrl", "run"]);
        if let Some(Command::Run(args)) = cli.command {
            assert!(args.episodes.is_none());
            assert!(args.rounds.is_none());
            assert!(!args.json);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn test_cli_parse_run_overrides() {
        let cli = Cli::parse_from([
            "fedrl",
            "run",
            "--episodes",
            "3",
            "-r",
            "7",
            "--target-accuracy",
            "0.8",
            "--seed",
            "11",
        ]);
        let Some(Command::Run(args)) = cli.command else {
            panic!("Expected Run command");
        };

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.rl.episodes, 3);
        assert_eq!(config.training.rounds, Some(7));
        assert_eq!(config.training.target_accuracy, Some(0.8));
        assert_eq!(config.rl.seed, Some(11));
    }

    #[test]
    fn test_apply_without_overrides_keeps_config() {
        let mut config = Config::default();
        RunArgs::default().apply(&mut config);
        assert_eq!(config.rl.episodes, Config::default().rl.episodes);
        assert_eq!(config.training.rounds, Config::default().training.rounds);
    }

    #[test]
    fn test_cli_parse_config_and_validate() {
        assert!(matches!(Cli::parse_from(["fedrl", "config"]).command, Some(Command::Config)));
        assert!(matches!(Cli::parse_from(["fedrl", "validate"]).command, Some(Command::Validate)));
    }

    #[test]
    fn test_cli_with_global_flags() {
        let cli = Cli::parse_from(["fedrl", "-c", "/path/to/fedrl.yml", "validate", "--verbose", "--log-stderr"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/fedrl.yml")));
        assert!(cli.verbose);
        assert!(cli.log_stderr);
    }

    #[test]
    fn test_log_path() {
        assert!(get_log_path().ends_with("fedrl/logs/fedrl.log"));
    }
}
