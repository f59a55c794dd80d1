//! Base round scheduler contract

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use eyre::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use super::cross_silo::FedAvgCrossSilo;
use super::transport::Transport;

/// Wire field carrying the RL-tuned value in the round configuration
pub const TUNED_VALUE_FIELD: &str = "fedrl";

/// Outcome of one completed federated round
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    /// 1-based round index within the episode
    #[serde(rename = "round-index")]
    pub round_index: u32,

    /// Global accuracy after aggregation
    pub accuracy: f64,
}

/// Per-round configuration broadcast to participants
///
/// Extensions attach extra fields through [`RoundConfig::with_field`]; they are
/// flattened next to the base fields on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundConfig {
    #[serde(rename = "current-round")]
    pub current_round: u32,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RoundConfig {
    pub fn new(current_round: u32) -> Self {
        Self {
            current_round,
            extra: Map::new(),
        }
    }

    /// Attach an extra negotiated field
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        debug!(%key, "RoundConfig::with_field: called");
        self.extra.insert(key.to_string(), value.into());
        self
    }

    /// Tuned value injected by the RL extension, if any
    pub fn tuned_value(&self) -> Option<u32> {
        self.extra
            .get(TUNED_VALUE_FIELD)
            .and_then(Value::as_u64)
            .and_then(|v| u32::try_from(v).ok())
    }
}

/// The base federated round loop
#[async_trait]
pub trait RoundScheduler: Send {
    /// Variant this scheduler implements
    fn kind(&self) -> FlServerKind;

    /// Prepare a fresh episode (round timer, participant state)
    async fn configure(&mut self) -> Result<()>;

    /// Dispatch one round and collect its outcome
    async fn run_round(&mut self, config: RoundConfig) -> Result<RoundOutcome>;

    /// Release connections to participants
    async fn close_connections(&mut self) -> Result<()>;
}

/// Base scheduler variants the RL extension can drive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlServerKind {
    #[default]
    #[serde(rename = "fedavg_cross_silo")]
    FedAvgCrossSilo,
}

impl FlServerKind {
    /// Build the base scheduler of this variant over a transport
    pub fn build(self, transport: Box<dyn Transport>) -> Box<dyn RoundScheduler> {
        debug!(kind = %self, "FlServerKind::build: called");
        match self {
            Self::FedAvgCrossSilo => Box::new(FedAvgCrossSilo::new(transport)),
        }
    }
}

impl fmt::Display for FlServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FedAvgCrossSilo => write!(f, "fedavg_cross_silo"),
        }
    }
}

impl FromStr for FlServerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fedavg_cross_silo" => Ok(Self::FedAvgCrossSilo),
            _ => Err(format!("Unknown FL server: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_config_wire_format() {
        let config = RoundConfig::new(3).with_field(TUNED_VALUE_FIELD, 5);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["current-round"], 3);
        assert_eq!(json["fedrl"], 5);

        let back: RoundConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.tuned_value(), Some(5));
    }

    #[test]
    fn test_tuned_value_absent() {
        assert_eq!(RoundConfig::new(1).tuned_value(), None);
        assert_eq!(RoundConfig::new(1).with_field(TUNED_VALUE_FIELD, "x").tuned_value(), None);
    }

    #[test]
    fn test_fl_server_kind_parse() {
        assert_eq!("fedavg_cross_silo".parse::<FlServerKind>(), Ok(FlServerKind::FedAvgCrossSilo));
        assert!("fedprox".parse::<FlServerKind>().is_err());
        assert_eq!(FlServerKind::FedAvgCrossSilo.to_string(), "fedavg_cross_silo");
    }

    #[test]
    fn test_fl_server_kind_yaml() {
        let kind: FlServerKind = serde_yaml::from_str("fedavg_cross_silo").unwrap();
        assert_eq!(kind, FlServerKind::FedAvgCrossSilo);
    }
}
