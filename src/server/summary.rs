//! Campaign summary returned when the last episode ends

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::fl::FlServerKind;

/// Per-episode figures recorded by the FL side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// Episode counter, starts at 0
    pub episode: u32,
    /// Rounds completed before the episode ended
    pub rounds: u32,
    /// Accuracy of the episode's last round
    #[serde(rename = "final-accuracy")]
    pub final_accuracy: f64,
}

/// Everything the FL side reports once the campaign is done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSummary {
    pub server: FlServerKind,
    pub episodes: Vec<EpisodeSummary>,
    #[serde(rename = "last-tuned-value")]
    pub last_tuned_value: Option<u32>,
    /// Wall time from configuration to termination
    pub elapsed: Duration,
}

impl CampaignSummary {
    pub fn total_rounds(&self) -> u32 {
        self.episodes.iter().map(|e| e.rounds).sum()
    }

    pub fn best_accuracy(&self) -> Option<f64> {
        self.episodes.iter().map(|e| e.final_accuracy).reduce(f64::max)
    }
}

impl fmt::Display for CampaignSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} campaign: {} episodes, {} rounds in {:.2?}",
            self.server,
            self.episodes.len(),
            self.total_rounds(),
            self.elapsed
        )?;
        for e in &self.episodes {
            writeln!(
                f,
                "  episode {:>3}: {:>4} rounds, final accuracy {:.2}%",
                e.episode + 1,
                e.rounds,
                100.0 * e.final_accuracy
            )?;
        }
        if let Some(best) = self.best_accuracy() {
            writeln!(f, "  best final accuracy: {:.2}%", 100.0 * best)?;
        }
        match self.last_tuned_value {
            Some(value) => write!(f, "  last tuned value: {}", value),
            None => write!(f, "  last tuned value: none"),
        }
    }
}
