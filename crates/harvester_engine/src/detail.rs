//! Detail page: the asset URL and classification tag of one item.

use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use harvester_core::{DetailInfo, SkipReason};
use url::Url;

use crate::pacing::{Pace, Pacer};
use crate::render::{navigate_within, PageSnapshot, Renderer};
use crate::{CatalogLayout, RenderError};

pub struct DetailExtractor<'a, P: Pacer + ?Sized> {
    layout: &'a CatalogLayout,
    timeout: Duration,
    pacer: &'a P,
}

impl<'a, P: Pacer + ?Sized> DetailExtractor<'a, P> {
    pub fn new(layout: &'a CatalogLayout, timeout: Duration, pacer: &'a P) -> Self {
        Self {
            layout,
            timeout,
            pacer,
        }
    }

    /// Load `url`, let it settle, and read the item's fields.
    ///
    /// Every failure is an `Err(SkipReason)` for this item only.
    pub async fn extract<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        url: &Url,
    ) -> Result<DetailInfo, SkipReason> {
        engine_debug!("Navigating to detail page: {}", url);
        navigate_within(renderer, url, self.timeout)
            .await
            .map_err(|err| {
                engine_warn!("Detail page {} failed to load: {}", url, err);
                load_failure(err)
            })?;

        // The primary asset may finish rendering after the load event, so the
        // DOM is captured only once the pause is over.
        self.pacer.pause(Pace::Settle).await;
        let page = renderer.snapshot().await.map_err(|err| {
            engine_warn!("Could not read detail page {}: {}", url, err);
            load_failure(err)
        })?;

        self.read_fields(&page).map_err(|reason| {
            engine_warn!("Could not extract details from {}: {}", url, reason);
            reason
        })
    }

    fn read_fields(&self, page: &PageSnapshot) -> Result<DetailInfo, SkipReason> {
        let source = page
            .select_first(&self.layout.asset)
            .map_err(extraction)?
            .and_then(|asset| {
                asset
                    .attr(&self.layout.asset_attribute)
                    .map(str::trim)
                    .filter(|src| !src.is_empty())
                    .map(str::to_string)
            })
            .ok_or(SkipReason::AssetMissing)?;
        let asset_url = page
            .resolve(&source)
            .map_err(|err| SkipReason::Extraction(format!("asset url `{source}`: {err}")))?;

        let classification = page
            .select_first(&self.layout.classification)
            .map_err(extraction)?
            .map(|el| el.text().to_string())
            .filter(|text| !text.is_empty());

        Ok(DetailInfo {
            asset_url: asset_url.to_string(),
            classification,
        })
    }
}

fn load_failure(err: RenderError) -> SkipReason {
    if err.is_timeout() {
        SkipReason::PageTimeout
    } else {
        extraction(err)
    }
}

fn extraction(err: RenderError) -> SkipReason {
    SkipReason::Extraction(err.to_string())
}
