//! Federated learning collaborators
//!
//! The pieces the RL-tuned server extends but does not own:
//! - [`RoundScheduler`]: the base round loop, selected by [`FlServerKind`]
//! - [`Transport`] / [`Participant`]: delivery of round configurations and
//!   client reports
//! - [`Model`], [`DataSource`], [`Trainer`]: injectable training capabilities
//!
//! [`simulated`] provides an in-process federation for the binary and tests.

mod capability;
mod cross_silo;
mod scheduler;
pub mod simulated;
mod transport;

pub use capability::{DataSource, Model, Sampler, Trainer};
pub use cross_silo::{EdgeServer, FedAvgCrossSilo};
pub use scheduler::{FlServerKind, RoundConfig, RoundOutcome, RoundScheduler, TUNED_VALUE_FIELD};
pub use transport::{ClientReport, InProcessTransport, Participant, Transport};
