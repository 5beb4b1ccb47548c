//! The rendering capability: load a page, then query its DOM with CSS selectors.
//!
//! Backends implement [`Renderer`] and are acquired through a [`Launcher`].
//! Loading and reading are separate steps; snapshots are plain owned HTML so
//! they can be held across awaits.

use std::time::Duration;

use async_trait::async_trait;
use engine_logging::engine_debug;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::RenderError;

#[async_trait]
pub trait Renderer: Send {
    /// Load `url` and wait for its load event.
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError>;

    /// Capture the DOM of the current page as it stands now.
    ///
    /// Scripts keep running between [`Renderer::navigate`] and this call, so a
    /// later snapshot can see content an earlier one did not.
    async fn snapshot(&mut self) -> Result<PageSnapshot, RenderError>;

    /// Release the session, waiting for the backend to wind down.
    async fn shutdown(&mut self) {
        self.close();
    }

    /// Release the underlying session without waiting. Used on drop, so it
    /// must tolerate being called more than once.
    fn close(&mut self);
}

/// Acquires a renderer for the duration of one run.
#[async_trait]
pub trait Launcher: Send + Sync {
    type Renderer: Renderer;

    async fn launch(&self) -> Result<Self::Renderer, RenderError>;
}

/// Navigate with a wall-clock budget; expiry maps to [`RenderError::Timeout`].
pub async fn navigate_within<R: Renderer + ?Sized>(
    renderer: &mut R,
    url: &Url,
    timeout: Duration,
) -> Result<(), RenderError> {
    match tokio::time::timeout(timeout, renderer.navigate(url)).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout {
            url: url.to_string(),
            timeout,
        }),
    }
}

/// Owns a launched renderer and closes it exactly once, on every exit path.
pub struct RenderSession<R: Renderer> {
    renderer: R,
    released: bool,
}

impl<R: Renderer> RenderSession<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            released: false,
        }
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Graceful release on the normal and fatal paths; dropping the session
    /// instead falls back to [`Renderer::close`].
    pub async fn release(mut self) {
        if !self.released {
            self.released = true;
            self.renderer.shutdown().await;
            engine_debug!("Renderer released");
        }
    }

    fn close_once(&mut self) {
        if !self.released {
            self.released = true;
            self.renderer.close();
            engine_debug!("Renderer released");
        }
    }
}

impl<R: Renderer> Drop for RenderSession<R> {
    fn drop(&mut self) {
        self.close_once();
    }
}

/// DOM of a loaded page plus the URL it was finally served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    pub url: Url,
    pub html: String,
}

impl PageSnapshot {
    pub fn new(url: Url, html: impl Into<String>) -> Self {
        Self {
            url,
            html: html.into(),
        }
    }

    pub fn select(&self, css: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        let selector = parse_selector(css)?;
        let document = Html::parse_document(&self.html);
        Ok(document
            .select(&selector)
            .map(ElementSnapshot::from_element)
            .collect())
    }

    pub fn select_first(&self, css: &str) -> Result<Option<ElementSnapshot>, RenderError> {
        Ok(self.select(css)?.into_iter().next())
    }

    /// Resolve a link found on this page against the page URL.
    pub fn resolve(&self, link: &str) -> Result<Url, url::ParseError> {
        self.url.join(link)
    }
}

/// Owned copy of one matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementSnapshot {
    tag: String,
    text: String,
    attrs: Vec<(String, String)>,
    html: String,
}

impl ElementSnapshot {
    fn from_element(element: ElementRef<'_>) -> Self {
        let value = element.value();
        Self {
            tag: value.name().to_ascii_lowercase(),
            text: normalize_text(element.text()),
            attrs: value
                .attrs()
                .map(|(name, val)| (name.to_string(), val.to_string()))
                .collect(),
            html: element.html(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Visible text with whitespace runs collapsed and ends trimmed.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Query descendants of this element.
    pub fn select(&self, css: &str) -> Result<Vec<ElementSnapshot>, RenderError> {
        let selector = parse_selector(css)?;
        let fragment = Html::parse_fragment(&self.html);
        let Some(scope) = fragment.root_element().children().find_map(ElementRef::wrap) else {
            return Ok(Vec::new());
        };
        Ok(scope
            .descendants()
            .skip(1)
            .filter_map(ElementRef::wrap)
            .filter(|el| selector.matches(el))
            .map(ElementSnapshot::from_element)
            .collect())
    }

    pub fn select_first(&self, css: &str) -> Result<Option<ElementSnapshot>, RenderError> {
        Ok(self.select(css)?.into_iter().next())
    }
}

fn parse_selector(css: &str) -> Result<Selector, RenderError> {
    Selector::parse(css).map_err(|err| RenderError::Selector {
        selector: css.to_string(),
        message: err.to_string(),
    })
}

fn normalize_text<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let joined: String = parts.collect();
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}
