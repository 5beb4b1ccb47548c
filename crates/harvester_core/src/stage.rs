use std::fmt;

use serde::Serialize;

/// Harvest state machine positions, both run-level and per item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Enumerating,
    Iterating,
    Skipping,
    Extracting,
    Fetching,
    Recording,
    Done,
    FatalAborted,
}

/// Why an item was passed over. None of these end the run.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The list row had no usable title or link.
    MalformedEntry(String),
    /// The detail link could not be resolved against the base origin.
    InvalidLink(String),
    /// The detail page did not load within its budget.
    PageTimeout,
    /// The detail page had no primary asset element or source.
    AssetMissing,
    /// Any other failure while reading the detail page.
    Extraction(String),
    /// Asset transfer failed (status, timeout, size, content type, network).
    Transfer(String),
    /// Asset bytes could not be written to disk.
    Persist(String),
    /// The record could not be appended to the store.
    Store(String),
}

impl SkipReason {
    /// Short stable label used for summary tallies.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MalformedEntry(_) => "malformed_entry",
            SkipReason::InvalidLink(_) => "invalid_link",
            SkipReason::PageTimeout => "page_timeout",
            SkipReason::AssetMissing => "asset_missing",
            SkipReason::Extraction(_) => "extraction",
            SkipReason::Transfer(_) => "transfer",
            SkipReason::Persist(_) => "persist",
            SkipReason::Store(_) => "store",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MalformedEntry(msg) => write!(f, "malformed list entry: {msg}"),
            SkipReason::InvalidLink(msg) => write!(f, "invalid detail link: {msg}"),
            SkipReason::PageTimeout => write!(f, "detail page timed out"),
            SkipReason::AssetMissing => write!(f, "no primary asset on detail page"),
            SkipReason::Extraction(msg) => write!(f, "extraction failed: {msg}"),
            SkipReason::Transfer(msg) => write!(f, "asset transfer failed: {msg}"),
            SkipReason::Persist(msg) => write!(f, "asset write failed: {msg}"),
            SkipReason::Store(msg) => write!(f, "record append failed: {msg}"),
        }
    }
}

/// Terminal result of processing one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Recorded { key: String },
    AlreadyHarvested { key: String },
    Skipped(SkipReason),
}

impl ItemOutcome {
    pub fn stage(&self) -> Stage {
        match self {
            ItemOutcome::Recorded { .. } => Stage::Recording,
            ItemOutcome::AlreadyHarvested { .. } | ItemOutcome::Skipped(_) => Stage::Skipping,
        }
    }
}
