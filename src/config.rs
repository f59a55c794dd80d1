//! fedrl configuration types and loading

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::fl::FlServerKind;

/// Main fedrl configuration
///
/// Built once at startup and handed to each component by value or reference.
/// Nothing writes back into it while a campaign runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reinforcement learning campaign settings
    pub rl: RlConfig,

    /// Per-episode federated training settings
    pub training: TrainingConfig,

    /// Cross-silo federation settings
    #[serde(rename = "cross-silo")]
    pub cross_silo: CrossSiloConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// The lifecycle controller cannot decide when an episode ends without a
    /// round budget or a target accuracy, so at least one is required.
    pub fn validate(&self) -> Result<()> {
        if self.training.rounds.is_none() && self.training.target_accuracy.is_none() {
            return Err(eyre!(
                "No episode termination criterion configured. Set training.rounds or training.target-accuracy."
            ));
        }
        if self.training.rounds == Some(0) {
            return Err(eyre!("training.rounds must be at least 1"));
        }
        if let Some(target) = self.training.target_accuracy {
            if !(0.0..=1.0).contains(&target) {
                return Err(eyre!("training.target-accuracy must be within [0, 1], got {}", target));
            }
        }
        if self.rl.episodes == 0 {
            return Err(eyre!("rl.episodes must be at least 1"));
        }
        if self.rl.min_tuned_value == 0 || self.rl.min_tuned_value > self.rl.max_tuned_value {
            return Err(eyre!(
                "Invalid tuned value range [{}, {}]",
                self.rl.min_tuned_value,
                self.rl.max_tuned_value
            ));
        }
        if self.cross_silo.edge_servers == 0 {
            return Err(eyre!("cross-silo.edge-servers must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .fedrl.yml
        let local_config = PathBuf::from(".fedrl.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/fedrl/fedrl.yml
        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("fedrl").join("fedrl.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Reinforcement learning campaign settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RlConfig {
    /// Base federated server variant extended by the RL agent
    #[serde(rename = "fl-server")]
    pub fl_server: FlServerKind,

    /// Total RL episodes in the campaign
    pub episodes: u32,

    /// Optional reward threshold, reported alongside the episode budget
    #[serde(rename = "target-reward")]
    pub target_reward: Option<f64>,

    /// Smallest tuned value the agent may choose
    #[serde(rename = "min-tuned-value")]
    pub min_tuned_value: u32,

    /// Largest tuned value the agent may choose
    #[serde(rename = "max-tuned-value")]
    pub max_tuned_value: u32,

    /// Seed for the random policy and the simulated federation
    pub seed: Option<u64>,
}

impl Default for RlConfig {
    fn default() -> Self {
        Self {
            fl_server: FlServerKind::default(),
            episodes: 5,
            target_reward: None,
            min_tuned_value: 1,
            max_tuned_value: 10,
            seed: None,
        }
    }
}

/// Per-episode federated training settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Round budget of one episode
    pub rounds: Option<u32>,

    /// Accuracy that ends an episode early
    #[serde(rename = "target-accuracy")]
    pub target_accuracy: Option<f64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            rounds: Some(10),
            target_accuracy: Some(0.9),
        }
    }
}

/// Cross-silo federation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossSiloConfig {
    /// Number of edge servers taking part in each global round
    #[serde(rename = "edge-servers")]
    pub edge_servers: usize,

    /// Training passes per local aggregation round on an edge server
    #[serde(rename = "local-epochs")]
    pub local_epochs: u32,
}

impl Default for CrossSiloConfig {
    fn default() -> Self {
        Self {
            edge_servers: 4,
            local_epochs: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.rl.fl_server, FlServerKind::FedAvgCrossSilo);
        assert_eq!(config.rl.episodes, 5);
        assert_eq!(config.training.rounds, Some(10));
        assert_eq!(config.cross_silo.edge_servers, 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_deserialize_config() {
        let yaml = r#"
rl:
  fl-server: fedavg_cross_silo
  episodes: 3
  target-reward: 0.95
  min-tuned-value: 2
  max-tuned-value: 6
  seed: 7

training:
  rounds: 20
  target-accuracy: 0.85

cross-silo:
  edge-servers: 8
  local-epochs: 2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.rl.episodes, 3);
        assert_eq!(config.rl.target_reward, Some(0.95));
        assert_eq!(config.rl.min_tuned_value, 2);
        assert_eq!(config.rl.max_tuned_value, 6);
        assert_eq!(config.rl.seed, Some(7));
        assert_eq!(config.training.rounds, Some(20));
        assert_eq!(config.training.target_accuracy, Some(0.85));
        assert_eq!(config.cross_silo.edge_servers, 8);
        assert_eq!(config.cross_silo.local_epochs, 2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let yaml = r#"
rl:
  episodes: 2
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.rl.episodes, 2);
        assert_eq!(config.rl.max_tuned_value, 10);
        assert_eq!(config.training.rounds, Some(10));
    }

    #[test]
    fn test_unknown_fl_server_rejected() {
        let yaml = r#"
rl:
  fl-server: fedprox
"#;
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_validate_requires_termination_criterion() {
        let mut config = Config::default();
        config.training.rounds = None;
        config.training.target_accuracy = None;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("termination criterion"));

        config.training.target_accuracy = Some(0.8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.rl.episodes = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.rl.min_tuned_value = 5;
        config.rl.max_tuned_value = 4;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.target_accuracy = Some(1.5);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.training.rounds = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "training:\n  rounds: 3\n  target-accuracy: null").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.training.rounds, Some(3));
        assert_eq!(config.training.target_accuracy, None);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        let path = PathBuf::from("/nonexistent/fedrl.yml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
