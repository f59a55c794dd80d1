//! RL side: environment capability, policies and the adapter that drives
//! the tuning handshake

mod accuracy_env;
mod adapter;
mod agent;
mod environment;
mod error;
mod policy;
mod space;

pub use accuracy_env::AccuracyEnv;
pub use adapter::{AdapterHandle, Boundary, DriveOutcome, EnvironmentAdapter};
pub use agent::{AgentReport, EpisodeReport, RandomAgent};
pub use environment::{Observation, RlEnvironment, StepResult};
pub use error::EnvError;
pub use policy::{Policy, RandomPolicy};
pub use space::{Action, ActionSpace};
