//! Cross-silo FedAvg: the central server and its edge servers

use std::time::Instant;

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use super::capability::{DataSource, Model, Sampler, Trainer};
use super::scheduler::{FlServerKind, RoundConfig, RoundOutcome, RoundScheduler};
use super::transport::{ClientReport, Participant, Transport};

/// Central server of cross-silo FedAvg
///
/// Each global round is broadcast to the edge servers; the round's accuracy
/// is the sample-weighted mean of the edge servers' reports.
pub struct FedAvgCrossSilo {
    transport: Box<dyn Transport>,
    rounds_dispatched: u64,
}

impl FedAvgCrossSilo {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            rounds_dispatched: 0,
        }
    }

    fn weighted_accuracy(reports: &[ClientReport]) -> Result<f64> {
        let total: usize = reports.iter().map(|r| r.num_samples).sum();
        if total == 0 {
            return Err(eyre!("No samples reported by {} participants", reports.len()));
        }
        let weighted: f64 = reports.iter().map(|r| r.accuracy * r.num_samples as f64).sum();
        Ok(weighted / total as f64)
    }
}

#[async_trait]
impl RoundScheduler for FedAvgCrossSilo {
    fn kind(&self) -> FlServerKind {
        FlServerKind::FedAvgCrossSilo
    }

    async fn configure(&mut self) -> Result<()> {
        debug!("FedAvgCrossSilo::configure: called");
        self.transport.configure().await.context("Failed to configure edge servers")
    }

    async fn run_round(&mut self, config: RoundConfig) -> Result<RoundOutcome> {
        let round_index = config.current_round;
        debug!(round = round_index, "FedAvgCrossSilo::run_round: called");
        if !self.transport.is_open() {
            return Err(eyre!("Connections closed, cannot dispatch round {}", round_index));
        }
        let started = Instant::now();

        let reports = self
            .transport
            .broadcast(&config)
            .await
            .context(format!("Round {} dispatch failed", round_index))?;
        let accuracy = Self::weighted_accuracy(&reports)?;
        self.rounds_dispatched += 1;

        info!(
            "Round {} done: accuracy {:.2}% from {} edge servers in {:?}",
            round_index,
            100.0 * accuracy,
            reports.len(),
            started.elapsed()
        );
        Ok(RoundOutcome { round_index, accuracy })
    }

    async fn close_connections(&mut self) -> Result<()> {
        debug!("FedAvgCrossSilo::close_connections: called");
        if !self.transport.is_open() {
            return Ok(());
        }
        info!("Closing connections after {} rounds", self.rounds_dispatched);
        self.transport.close().await
    }
}

/// Edge server running local aggregation rounds with injected capabilities
///
/// The number of local rounds per global round comes from the tuned value
/// in the round configuration; it falls back to one local round.
pub struct EdgeServer<D, T> {
    id: String,
    datasource: D,
    trainer: T,
    sampler: Sampler,
    local_epochs: u32,
}

impl<D, T> EdgeServer<D, T>
where
    D: DataSource,
    T: Trainer<Sample = D::Sample>,
{
    pub fn new(id: impl Into<String>, datasource: D, trainer: T, sampler: Sampler, local_epochs: u32) -> Self {
        Self {
            id: id.into(),
            datasource,
            trainer,
            sampler,
            local_epochs: local_epochs.max(1),
        }
    }
}

#[async_trait]
impl<D, T> Participant for EdgeServer<D, T>
where
    D: DataSource,
    T: Trainer<Sample = D::Sample>,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn configure(&mut self) -> Result<()> {
        debug!(id = %self.id, "EdgeServer::configure: called");
        self.trainer.reset_model();
        debug!(
            id = %self.id,
            parameters = self.trainer.model().parameters().len(),
            "EdgeServer::configure: model reset"
        );
        Ok(())
    }

    async fn train(&mut self, config: &RoundConfig) -> Result<ClientReport> {
        let local_rounds = config.tuned_value().unwrap_or(1);
        debug!(id = %self.id, round = config.current_round, %local_rounds, "EdgeServer::train: called");
        if self.sampler.is_empty() {
            return Err(eyre!("Edge server {} has no training samples", self.id));
        }

        for _ in 0..local_rounds {
            for _ in 0..self.local_epochs {
                self.trainer
                    .train_model(config, self.datasource.trainset(), &self.sampler)
                    .await?;
            }
        }

        let accuracy = self.trainer.test_model(self.datasource.testset()).await?;
        Ok(ClientReport {
            client_id: self.id.clone(),
            num_samples: self.sampler.len(),
            accuracy,
        })
    }
}
