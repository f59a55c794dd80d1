//! fedrl - Federated learning tuned by a reinforcement learning agent
//!
//! An RL agent chooses, round by round, a parameter of a federated training
//! run (the number of local aggregation rounds on edge servers). Two flows
//! run concurrently and never get ahead of each other:
//!
//! - the FL flow waits for the tuned value, runs a round and reports its
//!   accuracy
//! - the RL flow waits for that accuracy, steps its environment and picks the
//!   value for the next round
//!
//! # Modules
//!
//! - [`episode`] - Episode State shared by both flows
//! - [`handshake`] - One-shot signals and the tuning handshake
//! - [`lifecycle`] - Episode and campaign termination
//! - [`env`] - RL environment, policies and the environment adapter
//! - [`fl`] - Base round scheduler, transport and training capabilities
//! - [`server`] - The RL-tuned server and campaign wiring
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod env;
pub mod episode;
pub mod fl;
pub mod handshake;
pub mod lifecycle;
pub mod server;

// Re-export commonly used types
pub use config::{Config, CrossSiloConfig, RlConfig, TrainingConfig};
pub use env::{
    AccuracyEnv, Action, ActionSpace, AdapterHandle, AgentReport, Boundary, DriveOutcome, EnvError,
    EnvironmentAdapter, EpisodeReport, Observation, Policy, RandomAgent, RandomPolicy, RlEnvironment, StepResult,
};
pub use episode::{EpisodeState, SharedEpisode};
pub use fl::{FlServerKind, RoundConfig, RoundOutcome, RoundScheduler, TUNED_VALUE_FIELD};
pub use handshake::{HandshakeError, RoundObservation, Signal, TuningHandshake};
pub use lifecycle::{EpisodeDecision, EpisodeLimits, LifecycleController, LifecycleError, LifecycleState, RoundVerdict};
pub use server::{CampaignReport, CampaignSummary, EpisodeSummary, FedRlServer, run_campaign, run_with};
