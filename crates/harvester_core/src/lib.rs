//! Harvester core: pure domain model, dedup keys and per-item outcome bookkeeping.
mod known;
mod model;
mod sanitize;
mod stage;
mod summary;

pub use known::KnownKeySet;
pub use model::{
    or_not_available, CatalogEntry, DetailInfo, HarvestRecord, RecordError, NOT_AVAILABLE,
    STORE_HEADER,
};
pub use sanitize::{record_key, sanitize};
pub use stage::{ItemOutcome, SkipReason, Stage};
pub use summary::RunSummary;
