//! Episode lifecycle controller
//!
//! State machine for episode and campaign boundaries:
//!
//! ```text
//! Running --(round, no criterion met)--> Running
//! Running --(target accuracy | round budget)--> EpisodeDone
//! EpisodeDone --(episode budget exhausted)--> CampaignDone
//! EpisodeDone --> AwaitingReset --(new episode begin)--> Running
//! ```

mod controller;
mod error;

pub use controller::{EpisodeDecision, EpisodeLimits, LifecycleController, LifecycleState, RoundVerdict};
pub use error::LifecycleError;
