use std::collections::BTreeMap;

use serde::Serialize;

use crate::{ItemOutcome, Stage};

/// Tally of a harvest run, folded from item outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub owner: Option<String>,
    pub entries: usize,
    pub recorded: usize,
    pub already_harvested: usize,
    pub skipped: BTreeMap<String, usize>,
    pub known_keys_at_start: usize,
    pub known_keys_at_end: usize,
    pub final_stage: Stage,
    pub started_utc: Option<String>,
    pub finished_utc: Option<String>,
}

impl Default for RunSummary {
    fn default() -> Self {
        Self {
            owner: None,
            entries: 0,
            recorded: 0,
            already_harvested: 0,
            skipped: BTreeMap::new(),
            known_keys_at_start: 0,
            known_keys_at_end: 0,
            final_stage: Stage::Enumerating,
            started_utc: None,
            finished_utc: None,
        }
    }
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Recorded { .. } => self.recorded += 1,
            ItemOutcome::AlreadyHarvested { .. } => self.already_harvested += 1,
            ItemOutcome::Skipped(reason) => {
                *self.skipped.entry(reason.label().to_string()).or_insert(0) += 1;
            }
        }
    }

    pub fn skipped_total(&self) -> usize {
        self.skipped.values().sum()
    }

    pub fn processed(&self) -> usize {
        self.recorded + self.already_harvested + self.skipped_total()
    }
}
