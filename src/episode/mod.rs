//! Episode state shared by the FL round driver and the RL episode driver
//!
//! A single [`EpisodeState`] exists per campaign. It is wrapped in a
//! [`SharedEpisode`] so both flows can read it, while writes only happen at
//! the handoff points owned by the handshake and the lifecycle controller.

mod state;

pub use state::{EpisodeState, SharedEpisode};
