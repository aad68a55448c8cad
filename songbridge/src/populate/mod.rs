//! Playlist population
//!
//! Two interchangeable execution paths fill a destination playlist from an
//! identifier sequence: [`api::ApiPopulator`] drives the quota-limited
//! programmatic API, [`browser::SessionPopulator`] drives an authenticated
//! interactive browser session. Both produce the same [`PopulationOutcome`]
//! shape, so the orchestrator does not care which one ran.

pub mod api;
pub mod browser;
pub mod webdriver;

use crate::clients::VideoId;
use serde::Serialize;

/// Per-identifier result of one population attempt
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Identifier added to the playlist
    Added { index: usize, video_id: VideoId },
    /// Absent identifier (unresolved track); no remote call made
    Skipped { index: usize },
    /// Identifier could not be applied
    Failed {
        index: usize,
        video_id: Option<VideoId>,
        cause: String,
    },
}

/// Aggregate result of one population run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulationOutcome {
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Quota exhaustion stopped the batch before all items were attempted
    pub halted: bool,
    /// Per-item records, in processing order
    pub items: Vec<ItemOutcome>,
}

impl PopulationOutcome {
    /// Items processed (added + skipped + failed). Less than the input
    /// length when the run halted early.
    pub fn total(&self) -> usize {
        self.added + self.skipped + self.failed
    }

    fn record(&mut self, item: ItemOutcome) {
        match &item {
            ItemOutcome::Added { .. } => self.added += 1,
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
        self.items.push(item);
    }
}
