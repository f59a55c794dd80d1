//! In-process simulated federation
//!
//! A toy binary classification task (noisy linearly separable points) trained
//! with logistic regression. It stands in for a real model and dataset so the
//! RL-tuned server can run end to end; more local rounds per global round
//! reach higher accuracy sooner.

use async_trait::async_trait;
use eyre::{Result, eyre};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::Config;

use super::capability::{DataSource, Model, Sampler, Trainer};
use super::cross_silo::EdgeServer;
use super::scheduler::RoundConfig;
use super::transport::{InProcessTransport, Participant};

const TRAIN_SAMPLES: usize = 160;
const TEST_SAMPLES: usize = 80;
const LABEL_NOISE: f64 = 0.05;
const LEARNING_RATE: f32 = 0.05;

/// Labeled point in the plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub features: [f32; 2],
    pub label: bool,
}

/// Seeded synthetic dataset
#[derive(Debug, Clone)]
pub struct SyntheticDataSource {
    trainset: Vec<Sample>,
    testset: Vec<Sample>,
}

impl SyntheticDataSource {
    pub fn generate(seed: u64, train_len: usize, test_len: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let trainset = (0..train_len).map(|_| Self::sample(&mut rng, LABEL_NOISE)).collect();
        // Test labels are clean so accuracy measures the learned boundary
        let testset = (0..test_len).map(|_| Self::sample(&mut rng, 0.0)).collect();
        Self { trainset, testset }
    }

    fn sample(rng: &mut StdRng, noise: f64) -> Sample {
        let x = rng.random_range(-1.0f32..1.0);
        let y = rng.random_range(-1.0f32..1.0);
        let mut label = x + 0.5 * y > 0.1;
        if noise > 0.0 && rng.random_bool(noise) {
            label = !label;
        }
        Sample {
            features: [x, y],
            label,
        }
    }
}

impl DataSource for SyntheticDataSource {
    type Sample = Sample;

    fn trainset(&self) -> &[Sample] {
        &self.trainset
    }

    fn testset(&self) -> &[Sample] {
        &self.testset
    }
}

/// Logistic regression weights: two feature weights and a bias
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinearModel {
    weights: [f32; 3],
}

impl LinearModel {
    fn logit(&self, features: &[f32; 2]) -> f32 {
        let w = self.parameters();
        w[0] * features[0] + w[1] * features[1] + w[2]
    }

    pub fn predict(&self, features: &[f32; 2]) -> bool {
        self.logit(features) > 0.0
    }
}

impl Model for LinearModel {
    fn parameters(&self) -> &[f32] {
        &self.weights
    }

    fn parameters_mut(&mut self) -> &mut [f32] {
        &mut self.weights
    }
}

/// Plain SGD over the sampled indices
#[derive(Debug, Clone)]
pub struct SgdTrainer {
    model: LinearModel,
    learning_rate: f32,
}

impl SgdTrainer {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            model: LinearModel::default(),
            learning_rate,
        }
    }
}

#[async_trait]
impl Trainer for SgdTrainer {
    type Sample = Sample;
    type Model = LinearModel;

    fn model(&self) -> &LinearModel {
        &self.model
    }

    fn reset_model(&mut self) {
        self.model = LinearModel::default();
    }

    async fn train_model(&mut self, _config: &RoundConfig, trainset: &[Sample], sampler: &Sampler) -> Result<()> {
        for &index in sampler.indices() {
            let sample = trainset
                .get(index)
                .ok_or_else(|| eyre!("Sampler index {} outside trainset of {}", index, trainset.len()))?;
            let p = 1.0 / (1.0 + (-self.model.logit(&sample.features)).exp());
            let error = p - if sample.label { 1.0 } else { 0.0 };
            let lr = self.learning_rate;
            let weights = self.model.parameters_mut();
            weights[0] -= lr * error * sample.features[0];
            weights[1] -= lr * error * sample.features[1];
            weights[2] -= lr * error;
        }
        Ok(())
    }

    async fn test_model(&self, testset: &[Sample]) -> Result<f64> {
        if testset.is_empty() {
            return Err(eyre!("Empty testset"));
        }
        let correct = testset
            .iter()
            .filter(|s| self.model.predict(&s.features) == s.label)
            .count();
        Ok(correct as f64 / testset.len() as f64)
    }
}

/// Build the in-process federation described by `config`
pub fn build_federation(config: &Config) -> InProcessTransport {
    let seed = config.rl.seed.unwrap_or(0);
    debug!(edge_servers = config.cross_silo.edge_servers, %seed, "simulated::build_federation: called");

    let participants: Vec<Box<dyn Participant>> = (0..config.cross_silo.edge_servers)
        .map(|i| {
            let edge_seed = seed.wrapping_add(i as u64);
            let datasource = SyntheticDataSource::generate(edge_seed, TRAIN_SAMPLES, TEST_SAMPLES);
            let sampler = Sampler::shuffled(datasource.trainset().len(), edge_seed);
            let edge = EdgeServer::new(
                format!("edge-{}", i + 1),
                datasource,
                SgdTrainer::new(LEARNING_RATE),
                sampler,
                config.cross_silo.local_epochs,
            );
            Box::new(edge) as Box<dyn Participant>
        })
        .collect();

    let transport = InProcessTransport::new(participants);
    info!("Simulated federation of {} edge servers", transport.participant_count());
    transport
}
