use std::path::PathBuf;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::fetch::FetchSettings;
use crate::HarvestError;

/// Full configuration of one harvest run. Every field has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestSettings {
    pub start_url: String,
    /// Origin that relative detail links are resolved against.
    pub base_url: String,
    pub data_dir: PathBuf,
    pub asset_subdir: String,
    pub store_filename: String,
    /// Written next to the store after each run; `None` disables it.
    pub summary_filename: Option<String>,
    pub asset_extension: String,
    pub navigation_timeout_ms: u64,
    pub transfer_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    pub max_asset_bytes: u64,
    /// Entries ending in `/` match by prefix, e.g. `image/`.
    pub allowed_asset_types: Vec<String>,
    pub user_agent: String,
    pub renderer: RendererKind,
    pub browser: BrowserSettings,
    pub pacing: PacingSettings,
    pub layout: CatalogLayout,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            start_url: "https://www.wikiart.org/en/vincent-van-gogh/all-works/text-list"
                .to_string(),
            base_url: "https://www.wikiart.org".to_string(),
            data_dir: PathBuf::from("data"),
            asset_subdir: "raw_art".to_string(),
            store_filename: "metadata.csv".to_string(),
            summary_filename: Some("run_summary.json".to_string()),
            asset_extension: ".jpg".to_string(),
            navigation_timeout_ms: 60_000,
            transfer_timeout_ms: 60_000,
            connect_timeout_ms: 10_000,
            max_asset_bytes: 50 * 1024 * 1024,
            allowed_asset_types: vec![
                "image/".to_string(),
                "application/octet-stream".to_string(),
            ],
            user_agent: concat!("catalog-harvester/", env!("CARGO_PKG_VERSION")).to_string(),
            renderer: RendererKind::default(),
            browser: BrowserSettings::default(),
            pacing: PacingSettings::default(),
            layout: CatalogLayout::default(),
        }
    }
}

impl HarvestSettings {
    pub fn asset_dir(&self) -> PathBuf {
        self.data_dir.join(&self.asset_subdir)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_filename)
    }

    pub fn summary_path(&self) -> Option<PathBuf> {
        self.summary_filename
            .as_ref()
            .map(|name| self.data_dir.join(name))
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn start_url(&self) -> Result<Url, HarvestError> {
        parse_url("start", &self.start_url)
    }

    pub fn base_url(&self) -> Result<Url, HarvestError> {
        parse_url("base", &self.base_url)
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.transfer_timeout_ms),
            max_bytes: self.max_asset_bytes,
            allowed_content_types: self.allowed_asset_types.clone(),
            user_agent: Some(self.user_agent.clone()),
            ..FetchSettings::default()
        }
    }
}

fn parse_url(name: &'static str, value: &str) -> Result<Url, HarvestError> {
    Url::parse(value).map_err(|err| HarvestError::InvalidUrl {
        name,
        value: value.to_string(),
        message: err.to_string(),
    })
}

/// Which rendering backend loads catalog pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    /// Headless Chromium; needed when the catalog builds its DOM with scripts.
    #[default]
    Browser,
    /// Plain GET and parse, for catalogs served as static HTML.
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Interpreter the driver script runs under.
    pub program: String,
    /// Replaces the built-in Playwright driver; must speak the same line protocol.
    pub driver_script: Option<PathBuf>,
    pub headless: bool,
    pub launch_timeout_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            program: "node".to_string(),
            driver_script: None,
            headless: true,
            launch_timeout_ms: 30_000,
        }
    }
}

/// CSS selectors describing the two page shapes of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogLayout {
    pub heading: String,
    /// Word after which the heading names the collection owner.
    pub owner_separator: String,
    pub list_items: String,
    /// Relative to a list item; its text is the title and `href` the detail link.
    pub title_link: String,
    /// Relative to a list item.
    pub year: String,
    pub asset: String,
    pub asset_attribute: String,
    pub classification: String,
}

impl Default for CatalogLayout {
    fn default() -> Self {
        Self {
            heading: "h1".to_string(),
            owner_separator: "by".to_string(),
            list_items: "ul.painting-list-text > li".to_string(),
            title_link: "a".to_string(),
            year: "span.year".to_string(),
            asset: r#"img[itemprop="image"]"#.to_string(),
            asset_attribute: "src".to_string(),
            classification: "li.s-li-style a".to_string(),
        }
    }
}

/// Inclusive range a pacing delay is drawn from, uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange {
        min_ms: 0,
        max_ms: 0,
    };

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        if self.max_ms <= self.min_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rng.random_range(self.min_ms..=self.max_ms))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Wait between a detail page loading and reading its DOM.
    pub settle: DelayRange,
    /// Wait after an item is recorded, before the next one.
    pub cooldown: DelayRange,
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self {
            settle: DelayRange::new(1_000, 2_500),
            cooldown: DelayRange::new(1_500, 3_000),
        }
    }
}

impl PacingSettings {
    pub fn disabled() -> Self {
        Self {
            settle: DelayRange::ZERO,
            cooldown: DelayRange::ZERO,
        }
    }
}
