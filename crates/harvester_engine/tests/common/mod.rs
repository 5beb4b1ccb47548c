#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use harvester_engine::{
    HarvestEvent, Launcher, Pace, Pacer, PageSnapshot, ProgressSink, RenderError, Renderer,
};
use url::Url;

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

pub const LIST_PAGE: &str = r#"<html><body>
<h1>All works by Vincent van Gogh</h1>
<ul class="painting-list-text">
  <li><a href="/en/vincent-van-gogh/the-starry-night">The Starry Night</a> <span class="year">1889</span></li>
  <li><a href="/en/vincent-van-gogh/irises">Irises</a></li>
  <li><a href="/en/vincent-van-gogh/lost-work">Lost Work</a> <span class="year">1890</span></li>
</ul>
</body></html>"#;

pub fn detail_page(asset_src: Option<&str>, style: Option<&str>) -> String {
    let img = asset_src
        .map(|src| format!(r#"<img itemprop="image" src="{src}" alt="artwork">"#))
        .unwrap_or_default();
    let style = style
        .map(|s| format!(r#"<li class="s-li-style"><s>Style:</s> <a href="/style">{s}</a></li>"#))
        .unwrap_or_default();
    format!("<html><body><main>{img}<ul>{style}</ul></main></body></html>")
}

#[derive(Debug, Clone)]
pub enum FixturePage {
    Html(String),
    /// Reports a timeout straight away, like a backend with its own budget.
    Timeout,
    /// Never answers within any sane budget.
    Hang,
    Broken(String),
    /// Serves `initial` until `after` has passed since navigation, then `settled`,
    /// like a page whose scripts fill in the DOM after the load event.
    Late {
        initial: String,
        settled: String,
        after: Duration,
    },
}

/// In-memory renderer keyed by absolute URL.
#[derive(Clone, Default)]
pub struct FixtureLauncher {
    pages: Arc<HashMap<String, FixturePage>>,
    pub launched: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
    pub visited: Arc<Mutex<Vec<String>>>,
}

impl FixtureLauncher {
    pub fn new(pages: impl IntoIterator<Item = (String, FixturePage)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn closed_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn launched_count(&self) -> usize {
        self.launched.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl Launcher for FixtureLauncher {
    type Renderer = FixtureRenderer;

    async fn launch(&self) -> Result<FixtureRenderer, RenderError> {
        self.launched.fetch_add(1, Ordering::SeqCst);
        Ok(FixtureRenderer::with_launcher(self.clone()))
    }
}

struct LoadedPage {
    url: Url,
    page: FixturePage,
    at: Instant,
}

pub struct FixtureRenderer {
    launcher: FixtureLauncher,
    open: bool,
    current: Option<LoadedPage>,
}

impl FixtureRenderer {
    pub fn standalone(pages: impl IntoIterator<Item = (String, FixturePage)>) -> Self {
        Self::with_launcher(FixtureLauncher::new(pages))
    }

    fn with_launcher(launcher: FixtureLauncher) -> Self {
        Self {
            launcher,
            open: true,
            current: None,
        }
    }
}

#[async_trait]
impl Renderer for FixtureRenderer {
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError> {
        assert!(self.open, "navigate after close");
        self.launcher.visited.lock().unwrap().push(url.to_string());
        self.current = None;
        let page = self.launcher.pages.get(url.as_str()).cloned();
        match page {
            Some(page @ (FixturePage::Html(_) | FixturePage::Late { .. })) => {
                self.current = Some(LoadedPage {
                    url: url.clone(),
                    page,
                    at: Instant::now(),
                });
                Ok(())
            }
            Some(FixturePage::Timeout) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout: Duration::from_secs(60),
            }),
            Some(FixturePage::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(RenderError::Navigation {
                    url: url.to_string(),
                    message: "hang fixture finished".to_string(),
                })
            }
            Some(FixturePage::Broken(message)) => Err(RenderError::Navigation {
                url: url.to_string(),
                message,
            }),
            None => Err(RenderError::HttpStatus {
                url: url.to_string(),
                status: 404,
            }),
        }
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, RenderError> {
        assert!(self.open, "snapshot after close");
        let loaded = self.current.as_ref().ok_or_else(|| RenderError::Navigation {
            url: "about:blank".to_string(),
            message: "no page loaded".to_string(),
        })?;
        let html = match &loaded.page {
            FixturePage::Html(html) => html,
            FixturePage::Late {
                initial,
                settled,
                after,
            } => {
                if loaded.at.elapsed() >= *after {
                    settled
                } else {
                    initial
                }
            }
            other => unreachable!("{other:?} is never kept as the current page"),
        };
        Ok(PageSnapshot::new(loaded.url.clone(), html.clone()))
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.launcher.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[derive(Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<Pace>>,
}

impl RecordingPacer {
    pub fn pauses(&self) -> Vec<Pace> {
        self.pauses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, pace: Pace) {
        self.pauses.lock().unwrap().push(pace);
    }
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<HarvestEvent>>,
}

impl RecordingSink {
    pub fn take(&self) -> Vec<HarvestEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: HarvestEvent) {
        self.events.lock().unwrap().push(event);
    }
}
