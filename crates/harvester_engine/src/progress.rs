use harvester_core::{ItemOutcome, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestEvent {
    /// Run-level state change.
    StageChanged(Stage),
    CatalogListed { owner: String, entries: usize },
    /// Zero-based item `index` entered `stage`.
    ItemStage { index: usize, stage: Stage },
    ItemFinished { index: usize, outcome: ItemOutcome },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: HarvestEvent);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn emit(&self, _event: HarvestEvent) {}
}
