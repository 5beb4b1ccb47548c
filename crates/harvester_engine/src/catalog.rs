//! Catalog index page: owner name plus the ordered list of entries.

use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use harvester_core::CatalogEntry;
use thiserror::Error;
use url::Url;

use crate::render::{navigate_within, ElementSnapshot, Renderer};
use crate::{CatalogLayout, HarvestError, RenderError};

/// A list row that could not be turned into a [`CatalogEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("list item has no title")]
    MissingTitle,
    #[error("list item '{title}' has no detail link")]
    MissingLink { title: String },
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    pub owner: String,
    /// Page order; failures stay in place so progress numbering matches the page.
    pub entries: Vec<Result<CatalogEntry, EntryError>>,
}

pub struct ListEnumerator<'a> {
    layout: &'a CatalogLayout,
    timeout: Duration,
}

impl<'a> ListEnumerator<'a> {
    pub fn new(layout: &'a CatalogLayout, timeout: Duration) -> Self {
        Self { layout, timeout }
    }

    pub async fn enumerate<R: Renderer + ?Sized>(
        &self,
        renderer: &mut R,
        start_url: &Url,
    ) -> Result<Catalog, HarvestError> {
        engine_info!("Navigating to start URL: {}", start_url);
        navigate_within(renderer, start_url, self.timeout)
            .await
            .map_err(start_page_error)?;
        let page = renderer.snapshot().await.map_err(start_page_error)?;

        let heading = page
            .select_first(&self.layout.heading)
            .map_err(HarvestError::StartPage)?;
        let owner = heading
            .map(|h| parse_owner(h.text(), &self.layout.owner_separator))
            .filter(|owner| !owner.is_empty())
            .ok_or_else(|| HarvestError::OwnerMissing {
                selector: self.layout.heading.clone(),
            })?;
        engine_info!("Owner found: {}", owner);

        let items = page
            .select(&self.layout.list_items)
            .map_err(HarvestError::StartPage)?;
        if items.is_empty() {
            engine_warn!(
                "No list items matched `{}` on {}",
                self.layout.list_items,
                page.url
            );
        }
        let entries: Vec<_> = items.iter().map(|item| self.parse_entry(item)).collect();
        engine_info!("Found {} entries on the list page.", entries.len());

        Ok(Catalog { owner, entries })
    }

    fn parse_entry(&self, item: &ElementSnapshot) -> Result<CatalogEntry, EntryError> {
        let link = item
            .select_first(&self.layout.title_link)?
            .ok_or(EntryError::MissingTitle)?;
        let title = link.text().to_string();
        if title.is_empty() {
            return Err(EntryError::MissingTitle);
        }
        let detail_path = link
            .attr("href")
            .map(str::trim)
            .filter(|href| !href.is_empty())
            .ok_or_else(|| EntryError::MissingLink {
                title: title.clone(),
            })?
            .to_string();
        let year_hint = item
            .select_first(&self.layout.year)?
            .map(|year| year.text().to_string())
            .filter(|year| !year.is_empty());

        Ok(CatalogEntry {
            title,
            year_hint,
            detail_path,
        })
    }
}

fn start_page_error(err: RenderError) -> HarvestError {
    match err {
        RenderError::Timeout { url, timeout } => HarvestError::PageLoadTimeout { url, timeout },
        other => HarvestError::StartPage(other),
    }
}

/// Owner name is whatever follows the last standalone `separator` word.
/// Without a separator the whole heading is used.
pub fn parse_owner(heading: &str, separator: &str) -> String {
    let words: Vec<&str> = heading.split_whitespace().collect();
    let start = words
        .iter()
        .rposition(|word| *word == separator)
        .map_or(0, |idx| idx + 1);
    words[start..].join(" ")
}
