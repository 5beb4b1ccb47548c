//! The resumable harvest run.
//!
//! Per item: Skipping when the key is known, otherwise Extracting, Fetching
//! and Recording. Asset bytes are on disk before the record is appended, and a
//! key joins the known set only after its record is durable.

use std::fs;
use std::sync::Arc;

use chrono::Utc;
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use harvester_core::{
    record_key, CatalogEntry, HarvestRecord, ItemOutcome, KnownKeySet, RunSummary, SkipReason,
    Stage,
};
use url::Url;

use crate::catalog::{EntryError, ListEnumerator};
use crate::detail::DetailExtractor;
use crate::fetch::AssetSource;
use crate::pacing::{Pace, Pacer};
use crate::persist::{ensure_output_dir, AtomicFileWriter};
use crate::progress::{HarvestEvent, NullProgressSink, ProgressSink};
use crate::render::{Launcher, RenderSession, Renderer};
use crate::store::{RecordStore, StoreError};
use crate::{HarvestError, HarvestSettings};

/// Result of one run. `fatal` is set when the run ended in `FatalAborted`.
#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub fatal: Option<HarvestError>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.fatal.is_none()
    }
}

pub struct Harvester<L, A, P> {
    settings: HarvestSettings,
    launcher: L,
    assets: A,
    pacer: P,
    sink: Arc<dyn ProgressSink>,
}

impl<L, A, P> Harvester<L, A, P>
where
    L: Launcher,
    A: AssetSource,
    P: Pacer,
{
    pub fn new(settings: HarvestSettings, launcher: L, assets: A, pacer: P) -> Self {
        Self {
            settings,
            launcher,
            assets,
            pacer,
            sink: Arc::new(NullProgressSink),
        }
    }

    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Drive the run to `Done` or `FatalAborted`. The renderer is released
    /// before this returns in either case.
    pub async fn run(&self) -> RunReport {
        let mut summary = RunSummary::new();
        summary.started_utc = Some(Utc::now().to_rfc3339());

        let result = self.run_to_completion(&mut summary).await;

        summary.finished_utc = Some(Utc::now().to_rfc3339());
        let fatal = match result {
            Ok(()) => {
                summary.final_stage = Stage::Done;
                engine_info!(
                    "Harvest finished: {} recorded, {} already harvested, {} skipped",
                    summary.recorded,
                    summary.already_harvested,
                    summary.skipped_total()
                );
                None
            }
            Err(err) => {
                summary.final_stage = Stage::FatalAborted;
                engine_error!("Fatal error, harvest aborted: {}", err);
                Some(err)
            }
        };
        self.sink.emit(HarvestEvent::StageChanged(summary.final_stage));
        RunReport { summary, fatal }
    }

    async fn run_to_completion(&self, summary: &mut RunSummary) -> Result<(), HarvestError> {
        let start_url = self.settings.start_url()?;
        let base_url = self.settings.base_url()?;

        let asset_dir = self.settings.asset_dir();
        ensure_output_dir(&asset_dir)?;
        let mut store = RecordStore::open(self.settings.store_path())?;
        let mut known = store.load_known_keys();
        summary.known_keys_at_start = known.len();
        summary.known_keys_at_end = known.len();
        if !known.is_empty() {
            engine_info!(
                "Resuming harvest. Found {} previously harvested items.",
                known.len()
            );
        }

        let renderer = self.launcher.launch().await.map_err(HarvestError::Launch)?;
        let mut session = RenderSession::new(renderer);

        let mut pass = CatalogPass {
            settings: &self.settings,
            assets: &self.assets,
            pacer: &self.pacer,
            sink: self.sink.as_ref(),
            writer: AtomicFileWriter::new(asset_dir),
            store: &mut store,
            known: &mut known,
            base_url: &base_url,
        };
        let result = pass
            .run(session.renderer_mut(), &start_url, summary)
            .await;

        session.release().await;
        summary.known_keys_at_end = known.len();
        result
    }
}

/// Borrowed state for one pass over the catalog.
struct CatalogPass<'a, A: ?Sized, P: ?Sized> {
    settings: &'a HarvestSettings,
    assets: &'a A,
    pacer: &'a P,
    sink: &'a dyn ProgressSink,
    writer: AtomicFileWriter,
    store: &'a mut RecordStore,
    known: &'a mut KnownKeySet,
    base_url: &'a Url,
}

impl<A, P> CatalogPass<'_, A, P>
where
    A: AssetSource + ?Sized,
    P: Pacer + ?Sized,
{
    async fn run<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        start_url: &Url,
        summary: &mut RunSummary,
    ) -> Result<(), HarvestError> {
        self.sink.emit(HarvestEvent::StageChanged(Stage::Enumerating));
        let timeout = self.settings.navigation_timeout();
        let catalog = ListEnumerator::new(&self.settings.layout, timeout)
            .enumerate(renderer, start_url)
            .await?;

        summary.owner = Some(catalog.owner.clone());
        summary.entries = catalog.entries.len();
        self.sink.emit(HarvestEvent::CatalogListed {
            owner: catalog.owner.clone(),
            entries: catalog.entries.len(),
        });
        self.sink.emit(HarvestEvent::StageChanged(Stage::Iterating));

        let total = catalog.entries.len();
        for (index, entry) in catalog.entries.iter().enumerate() {
            let outcome = self
                .process(renderer, &catalog.owner, index, total, entry)
                .await;
            if let ItemOutcome::Skipped(reason) = &outcome {
                match entry {
                    Ok(entry) => engine_warn!(
                        "[Skipped] ({}/{}) '{}': {}",
                        index + 1,
                        total,
                        entry.title,
                        reason
                    ),
                    Err(_) => engine_warn!("[Skipped] ({}/{}): {}", index + 1, total, reason),
                }
            }
            summary.apply(&outcome);
            self.sink.emit(HarvestEvent::ItemFinished { index, outcome });
        }
        Ok(())
    }

    async fn process<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        owner: &str,
        index: usize,
        total: usize,
        entry: &Result<CatalogEntry, EntryError>,
    ) -> ItemOutcome {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                self.enter(index, Stage::Skipping);
                return ItemOutcome::Skipped(SkipReason::MalformedEntry(err.to_string()));
            }
        };

        let key = record_key(owner, &entry.title, &self.settings.asset_extension);
        if self.known.contains(&key) {
            engine_info!(
                "Skipping ({}/{}): '{}' (already harvested)",
                index + 1,
                total,
                entry.title
            );
            self.enter(index, Stage::Skipping);
            return ItemOutcome::AlreadyHarvested { key };
        }

        engine_info!("Processing ({}/{}): '{}'", index + 1, total, entry.title);
        match self.harvest(renderer, owner, index, entry, &key).await {
            Ok(()) => ItemOutcome::Recorded { key },
            Err(reason) => {
                self.enter(index, Stage::Skipping);
                ItemOutcome::Skipped(reason)
            }
        }
    }

    async fn harvest<R: Renderer + ?Sized>(
        &mut self,
        renderer: &mut R,
        owner: &str,
        index: usize,
        entry: &CatalogEntry,
        key: &str,
    ) -> Result<(), SkipReason> {
        let detail_url = self
            .base_url
            .join(&entry.detail_path)
            .map_err(|err| SkipReason::InvalidLink(format!("{}: {err}", entry.detail_path)))?;

        self.enter(index, Stage::Extracting);
        let timeout = self.settings.navigation_timeout();
        let detail = DetailExtractor::new(&self.settings.layout, timeout, self.pacer)
            .extract(renderer, &detail_url)
            .await?;

        self.enter(index, Stage::Fetching);
        engine_info!("  Downloading asset from: {}", detail.asset_url);
        let payload = self
            .assets
            .fetch(&detail.asset_url)
            .await
            .map_err(|err| SkipReason::Transfer(err.to_string()))?;
        let meta = &payload.metadata;
        if meta.redirect_count > 0 {
            engine_debug!(
                "  {} redirected {} time(s) to {}",
                meta.original_url,
                meta.redirect_count,
                meta.final_url
            );
        }
        let path = self
            .writer
            .write(key, &payload.bytes)
            .map_err(|err| SkipReason::Persist(err.to_string()))?;
        engine_info!(
            "  Asset saved to: {} ({} bytes, {})",
            path.display(),
            meta.byte_len,
            meta.content_type.as_deref().unwrap_or("unknown type")
        );

        self.enter(index, Stage::Recording);
        let appended = HarvestRecord::new(key.to_string(), owner, entry, &detail)
            .map_err(StoreError::from)
            .and_then(|record| self.store.append(&record));
        if let Err(err) = appended {
            // The asset must not outlive a record that was never written.
            if let Err(remove_err) = fs::remove_file(&path) {
                engine_error!(
                    "  Could not remove unrecorded asset {}: {}",
                    path.display(),
                    remove_err
                );
            }
            return Err(SkipReason::Store(err.to_string()));
        }
        self.known.insert(key);

        self.pacer.pause(Pace::Cooldown).await;
        Ok(())
    }

    fn enter(&self, index: usize, stage: Stage) {
        self.sink.emit(HarvestEvent::ItemStage { index, stage });
    }
}
