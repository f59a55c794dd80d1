//! Injectable training capabilities
//!
//! Model definition, dataset loading and the training loop belong to the
//! host application. The federation only needs these seams.

use async_trait::async_trait;
use eyre::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::scheduler::RoundConfig;

/// A trainable model
pub trait Model: Send + Sync {
    fn parameters(&self) -> &[f32];

    fn parameters_mut(&mut self) -> &mut [f32];
}

/// Source of training and test samples
pub trait DataSource: Send + Sync {
    type Sample: Send + Sync;

    fn trainset(&self) -> &[Self::Sample];

    fn testset(&self) -> &[Self::Sample];
}

/// Training loop over a model it owns
#[async_trait]
pub trait Trainer: Send {
    type Sample: Send + Sync;
    type Model: Model;

    fn model(&self) -> &Self::Model;

    /// Reinitialize the model before a new episode
    fn reset_model(&mut self);

    /// One training pass over the samples selected by `sampler`
    async fn train_model(&mut self, config: &RoundConfig, trainset: &[Self::Sample], sampler: &Sampler) -> Result<()>;

    /// Fraction of `testset` classified correctly
    async fn test_model(&self, testset: &[Self::Sample]) -> Result<f64>;
}

/// Selection of trainset indices a participant trains on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sampler {
    indices: Vec<usize>,
}

impl Sampler {
    /// Every index in a seeded random order
    pub fn shuffled(len: usize, seed: u64) -> Self {
        let mut indices: Vec<usize> = (0..len).collect();
        indices.shuffle(&mut StdRng::seed_from_u64(seed));
        Self { indices }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
