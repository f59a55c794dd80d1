//! Round delivery to participants

use async_trait::async_trait;
use eyre::{Context, Result, eyre};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::scheduler::RoundConfig;

/// Report a participant returns after training a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientReport {
    #[serde(rename = "client-id")]
    pub client_id: String,

    #[serde(rename = "num-samples")]
    pub num_samples: usize,

    pub accuracy: f64,
}

/// A federation participant (an edge server in cross-silo training)
#[async_trait]
pub trait Participant: Send {
    fn id(&self) -> &str;

    /// Reset per-episode training state
    async fn configure(&mut self) -> Result<()> {
        Ok(())
    }

    /// Train one global round under `config`
    async fn train(&mut self, config: &RoundConfig) -> Result<ClientReport>;
}

/// Delivers round configurations and gathers client reports
#[async_trait]
pub trait Transport: Send {
    /// Reset every participant for a new episode
    async fn configure(&mut self) -> Result<()>;

    /// Send `config` to every participant and collect their reports
    async fn broadcast(&mut self, config: &RoundConfig) -> Result<Vec<ClientReport>>;

    /// Close every participant connection
    async fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Transport to participants living in the same process
pub struct InProcessTransport {
    participants: Vec<Box<dyn Participant>>,
    open: bool,
}

impl InProcessTransport {
    pub fn new(participants: Vec<Box<dyn Participant>>) -> Self {
        debug!(participants = participants.len(), "InProcessTransport::new: called");
        Self {
            participants,
            open: true,
        }
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(eyre!("Transport is closed"))
        }
    }
}

#[async_trait]
impl Transport for InProcessTransport {
    async fn configure(&mut self) -> Result<()> {
        debug!("InProcessTransport::configure: called");
        self.ensure_open()?;
        try_join_all(self.participants.iter_mut().map(|p| p.configure())).await?;
        Ok(())
    }

    async fn broadcast(&mut self, config: &RoundConfig) -> Result<Vec<ClientReport>> {
        debug!(round = config.current_round, "InProcessTransport::broadcast: called");
        self.ensure_open()?;
        let round = config.current_round;
        try_join_all(self.participants.iter_mut().map(|p| async move {
            let id = p.id().to_string();
            p.train(config)
                .await
                .context(format!("Participant {} failed round {}", id, round))
        }))
        .await
    }

    async fn close(&mut self) -> Result<()> {
        if self.open {
            info!("Closing connections to {} participants", self.participants.len());
            self.open = false;
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fl::TUNED_VALUE_FIELD;

    struct EchoParticipant {
        id: String,
        seen: Vec<u32>,
    }

    #[async_trait]
    impl Participant for EchoParticipant {
        fn id(&self) -> &str {
            &self.id
        }

        async fn train(&mut self, config: &RoundConfig) -> Result<ClientReport> {
            self.seen.push(config.current_round);
            Ok(ClientReport {
                client_id: self.id.clone(),
                num_samples: 10,
                accuracy: config.tuned_value().unwrap_or(0) as f64 / 10.0,
            })
        }
    }

    struct FailingParticipant;

    #[async_trait]
    impl Participant for FailingParticipant {
        fn id(&self) -> &str {
            "edge-broken"
        }

        async fn train(&mut self, _config: &RoundConfig) -> Result<ClientReport> {
            Err(eyre!("out of memory"))
        }
    }

    fn echo(id: &str) -> Box<dyn Participant> {
        Box::new(EchoParticipant {
            id: id.to_string(),
            seen: Vec::new(),
        })
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_participant() {
        let mut transport = InProcessTransport::new(vec![echo("a"), echo("b")]);
        let config = RoundConfig::new(1).with_field(TUNED_VALUE_FIELD, 4);

        let reports = transport.broadcast(&config).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].client_id, "a");
        assert_eq!(reports[1].client_id, "b");
        assert!(reports.iter().all(|r| r.accuracy == 0.4));
    }

    #[tokio::test]
    async fn test_broadcast_failure_names_participant() {
        let mut transport = InProcessTransport::new(vec![echo("a"), Box::new(FailingParticipant)]);

        let err = transport.broadcast(&RoundConfig::new(4)).await.unwrap_err();

        assert!(err.to_string().contains("Participant edge-broken failed round 4"));
        assert!(format!("{:#}", err).contains("out of memory"));
    }

    #[tokio::test]
    async fn test_closed_transport_rejects_broadcast() {
        let mut transport = InProcessTransport::new(vec![echo("a")]);
        transport.close().await.unwrap();

        assert!(!transport.is_open());
        assert!(transport.broadcast(&RoundConfig::new(1)).await.is_err());
        assert!(transport.configure().await.is_err());
        // closing twice is fine
        transport.close().await.unwrap();
    }
}
