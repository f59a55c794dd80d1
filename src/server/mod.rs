//! RL-tuned federated server and campaign wiring
//!
//! [`FedRlServer`] is the FL flow and [`RandomAgent`] the RL flow. Both share
//! one Episode State through the handshake and the lifecycle controller and
//! run concurrently on the same runtime until the campaign is done.

mod fedrl;
mod summary;

pub use fedrl::FedRlServer;
pub use summary::{CampaignSummary, EpisodeSummary};

use std::sync::Arc;

use eyre::{Context, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;
use crate::env::{AccuracyEnv, ActionSpace, AgentReport, RandomAgent, RlEnvironment};
use crate::episode::SharedEpisode;
use crate::fl::{RoundScheduler, simulated};
use crate::handshake::TuningHandshake;
use crate::lifecycle::{EpisodeLimits, LifecycleController};

/// Outcome of a whole campaign, one report per flow
#[derive(Debug, Clone, Serialize)]
pub struct CampaignReport {
    pub summary: CampaignSummary,
    pub agent: AgentReport,
}

/// Run a campaign against the in-process simulated federation
pub async fn run_campaign(config: &Config) -> Result<CampaignReport> {
    debug!("server::run_campaign: called");
    let transport = simulated::build_federation(config);
    let base = config.rl.fl_server.build(Box::new(transport));
    let space = action_space(config)?;
    run_with(config, base, Box::new(AccuracyEnv::new(space))).await
}

/// Run a campaign with an explicit base scheduler and environment
///
/// An error from either flow aborts the other.
pub async fn run_with(
    config: &Config,
    base: Box<dyn RoundScheduler>,
    env: Box<dyn RlEnvironment>,
) -> Result<CampaignReport> {
    debug!(kind = %base.kind(), "server::run_with: called");
    config.validate()?;

    let episode = SharedEpisode::default();
    let handshake = Arc::new(TuningHandshake::new(episode.clone()));
    let limits = EpisodeLimits::from_config(config)?;
    let controller = Arc::new(LifecycleController::new(limits, episode));

    let (agent, handle) = RandomAgent::new(env, config.rl.seed, handshake.clone(), controller.clone());
    let agent = agent.with_target_reward(config.rl.target_reward);
    let server = FedRlServer::new(config.clone(), base, handshake, controller, handle);

    let (summary, agent) = tokio::try_join!(server.run(), agent.run())?;
    info!("Campaign complete after {} RL steps", agent.total_steps());
    Ok(CampaignReport { summary, agent })
}

/// Action space over the configured tuned value range
pub fn action_space(config: &Config) -> Result<ActionSpace> {
    ActionSpace::new(config.rl.min_tuned_value, config.rl.max_tuned_value).context("Invalid tuned value range")
}
