//! Default rendering backend: plain HTTP GET plus HTML parsing.
//!
//! Pages are not script-executed, so [`Renderer::snapshot`] returns the page
//! exactly as served. Catalogs that build their DOM client-side need the
//! browser backend instead.

use std::time::Duration;

use async_trait::async_trait;
use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use engine_logging::engine_debug;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::render::{Launcher, PageSnapshot, Renderer};
use crate::{HarvestSettings, RenderError};

#[derive(Debug, Clone)]
pub struct HttpLauncher {
    user_agent: String,
    connect_timeout: Duration,
    timeout: Duration,
}

impl HttpLauncher {
    pub fn new(settings: &HarvestSettings) -> Self {
        Self {
            user_agent: settings.user_agent.clone(),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            timeout: settings.navigation_timeout(),
        }
    }
}

#[async_trait]
impl Launcher for HttpLauncher {
    type Renderer = HttpRenderer;

    async fn launch(&self) -> Result<HttpRenderer, RenderError> {
        let client = reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|err| RenderError::Launch(err.to_string()))?;
        Ok(HttpRenderer {
            client: Some(client),
            timeout: self.timeout,
            current: None,
        })
    }
}

pub struct HttpRenderer {
    client: Option<reqwest::Client>,
    timeout: Duration,
    current: Option<PageSnapshot>,
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError> {
        self.current = None;
        let client = self.client.as_ref().ok_or_else(|| RenderError::Navigation {
            url: url.to_string(),
            message: "renderer already closed".to_string(),
        })?;

        let response = client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.map_error(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|err| self.map_error(url, err))?;

        let html = decode_page(&body, content_type.as_deref());
        engine_debug!("Loaded {} ({} bytes)", final_url, body.len());
        self.current = Some(PageSnapshot::new(final_url, html));
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, RenderError> {
        self.current.clone().ok_or_else(|| RenderError::Navigation {
            url: "about:blank".to_string(),
            message: "no page loaded".to_string(),
        })
    }

    fn close(&mut self) {
        self.client = None;
        self.current = None;
    }
}

impl HttpRenderer {
    fn map_error(&self, url: &Url, err: reqwest::Error) -> RenderError {
        if err.is_timeout() {
            RenderError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            RenderError::Navigation {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Decode page bytes to text: BOM, then the Content-Type charset, then detection.
///
/// Malformed sequences become U+FFFD rather than failing the page.
pub fn decode_page(bytes: &[u8], content_type: Option<&str>) -> String {
    let encoding = Encoding::for_bom(bytes)
        .map(|(encoding, _)| encoding)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or_else(|| {
            let mut detector = EncodingDetector::new();
            detector.feed(bytes, true);
            detector.guess(None, true)
        });
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\'']))
    })
}

#[cfg(test)]
mod tests {
    use super::{charset_label, decode_page};

    #[test]
    fn charset_header_wins_over_detection() {
        let text = decode_page(b"caf\xe9", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(text, "café");
    }

    #[test]
    fn bom_wins_over_header() {
        let text = decode_page(b"\xEF\xBB\xBFhello", Some("text/html; charset=ISO-8859-1"));
        assert_eq!(text, "hello");
    }

    #[test]
    fn charset_label_is_case_insensitive_and_unquoted() {
        assert_eq!(charset_label("text/html; Charset=\"utf-8\""), Some("utf-8"));
        assert_eq!(charset_label("text/html"), None);
    }
}
