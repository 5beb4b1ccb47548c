//! Harvester engine: rendering, extraction, transfer, persistence and the run loop.
mod browser_render;
mod catalog;
mod detail;
mod fetch;
mod harvest;
mod http_render;
mod pacing;
mod persist;
mod progress;
mod render;
mod settings;
mod store;
mod summary;
mod types;

pub use browser_render::{BrowserLauncher, BrowserRenderer};
pub use catalog::{parse_owner, Catalog, EntryError, ListEnumerator};
pub use detail::DetailExtractor;
pub use fetch::{AssetSource, FetchSettings, ReqwestFetcher};
pub use harvest::{Harvester, RunReport};
pub use http_render::{decode_page, HttpLauncher, HttpRenderer};
pub use pacing::{Pace, Pacer, RandomPacer};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use progress::{HarvestEvent, NullProgressSink, ProgressSink};
pub use render::{
    navigate_within, ElementSnapshot, Launcher, PageSnapshot, RenderSession, Renderer,
};
pub use settings::{
    BrowserSettings, CatalogLayout, DelayRange, HarvestSettings, PacingSettings, RendererKind,
};
pub use store::{RecordStore, StoreError};
pub use summary::write_run_summary;
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, HarvestError, RenderError};
