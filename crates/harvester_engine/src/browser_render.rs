//! Browser rendering backend: headless Chromium driven by Playwright.
//!
//! The browser lives in a `node` child process running a small driver script.
//! Commands and replies are JSON lines over the child's stdin and stdout, each
//! tagged with an id. The page keeps running its scripts between
//! [`Renderer::navigate`] and [`Renderer::snapshot`], so content rendered after
//! the load event shows up in a later snapshot.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use engine_logging::{engine_debug, engine_info, engine_warn};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use url::Url;

use crate::render::{Launcher, PageSnapshot, Renderer};
use crate::{BrowserSettings, HarvestSettings, RenderError};

/// Extra time a reply may take beyond the navigation budget.
const REPLY_GRACE: Duration = Duration::from_secs(5);
const DRIVER_EXIT_GRACE: Duration = Duration::from_secs(5);

const DRIVER_SCRIPT: &str = r#"
const readline = require('readline');
const { chromium } = require('playwright');

const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
const describe = (err) => String((err && err.message) || err);

(async () => {
  const browser = await chromium.launch({ headless: process.env.HARVESTER_HEADLESS !== '0' });
  const context = await browser.newContext({
    userAgent: process.env.HARVESTER_USER_AGENT || undefined,
  });
  const page = await context.newPage();
  reply({ id: 0, ok: true });

  const lines = readline.createInterface({ input: process.stdin });
  for await (const line of lines) {
    let cmd = {};
    try {
      cmd = JSON.parse(line);
      if (cmd.op === 'goto') {
        const response = await page.goto(cmd.url, { waitUntil: 'load', timeout: cmd.timeout_ms });
        reply({ id: cmd.id, ok: true, status: response ? response.status() : null, url: page.url() });
      } else if (cmd.op === 'content') {
        reply({ id: cmd.id, ok: true, url: page.url(), html: await page.content() });
      } else {
        reply({ id: cmd.id, ok: false, error: 'unknown op ' + cmd.op });
      }
    } catch (err) {
      reply({ id: cmd.id, ok: false, timeout: !!err && err.name === 'TimeoutError', error: describe(err) });
    }
  }
  await browser.close();
})().catch((err) => {
  reply({ id: 0, ok: false, error: describe(err) });
  process.exit(1);
});
"#;

#[derive(Debug, Serialize)]
struct DriverCommand<'a> {
    id: u64,
    #[serde(flatten)]
    op: DriverOp<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum DriverOp<'a> {
    Goto { url: &'a str, timeout_ms: u64 },
    Content,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DriverReply {
    id: u64,
    ok: bool,
    status: Option<u16>,
    url: Option<String>,
    html: Option<String>,
    timeout: bool,
    error: Option<String>,
}

impl DriverReply {
    fn landed_on(&self) -> Option<Url> {
        self.url.as_deref().and_then(|url| Url::parse(url).ok())
    }
}

#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    browser: BrowserSettings,
    user_agent: String,
    timeout: Duration,
}

impl BrowserLauncher {
    pub fn new(settings: &HarvestSettings) -> Self {
        Self {
            browser: settings.browser.clone(),
            user_agent: settings.user_agent.clone(),
            timeout: settings.navigation_timeout(),
        }
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.browser.program);
        match &self.browser.driver_script {
            Some(script) => command.arg(script),
            None => command.arg("-e").arg(DRIVER_SCRIPT),
        };
        command
            .env(
                "HARVESTER_HEADLESS",
                if self.browser.headless { "1" } else { "0" },
            )
            .env("HARVESTER_USER_AGENT", &self.user_agent)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl Launcher for BrowserLauncher {
    type Renderer = BrowserRenderer;

    async fn launch(&self) -> Result<BrowserRenderer, RenderError> {
        let launch_failed = |message: String| {
            RenderError::Launch(format!("{}: {message}", self.browser.program))
        };

        let mut child = self
            .command()
            .spawn()
            .map_err(|err| launch_failed(err.to_string()))?;
        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(launch_failed("driver pipes unavailable".to_string()));
        };
        let mut renderer = BrowserRenderer {
            child: Some(child),
            stdin: Some(stdin),
            replies: BufReader::new(stdout).lines(),
            timeout: self.timeout,
            next_id: 1,
            current: None,
        };

        // Dropping the half-started renderer kills the driver.
        let budget = Duration::from_millis(self.browser.launch_timeout_ms);
        let ready = tokio::time::timeout(budget, renderer.read_reply(0))
            .await
            .map_err(|_| launch_failed(format!("driver not ready within {budget:?}")))?
            .map_err(launch_failed)?;
        if !ready.ok {
            return Err(launch_failed(
                ready
                    .error
                    .unwrap_or_else(|| "driver refused to start".to_string()),
            ));
        }

        engine_info!("Browser renderer ready ({})", self.browser.program);
        Ok(renderer)
    }
}

#[derive(Debug)]
pub struct BrowserRenderer {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    replies: Lines<BufReader<ChildStdout>>,
    timeout: Duration,
    next_id: u64,
    current: Option<Url>,
}

impl BrowserRenderer {
    async fn request(&mut self, url: &str, op: DriverOp<'_>) -> Result<DriverReply, RenderError> {
        let failed = |message: String| RenderError::Navigation {
            url: url.to_string(),
            message,
        };

        let id = self.next_id;
        self.next_id += 1;
        let mut line = serde_json::to_string(&DriverCommand { id, op })
            .map_err(|err| failed(err.to_string()))?;
        line.push('\n');

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| failed("renderer already closed".to_string()))?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|err| failed(format!("driver unavailable: {err}")))?;
        stdin
            .flush()
            .await
            .map_err(|err| failed(format!("driver unavailable: {err}")))?;

        match tokio::time::timeout(self.timeout + REPLY_GRACE, self.read_reply(id)).await {
            Ok(reply) => reply.map_err(failed),
            Err(_) => Err(RenderError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }),
        }
    }

    /// Next reply carrying `id`. Replies to abandoned requests are dropped.
    async fn read_reply(&mut self, id: u64) -> Result<DriverReply, String> {
        loop {
            let line = match self.replies.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return Err("driver exited".to_string()),
                Err(err) => return Err(format!("driver output unreadable: {err}")),
            };
            let reply: DriverReply = serde_json::from_str(&line)
                .map_err(|err| format!("malformed driver reply: {err}"))?;
            if reply.id == id {
                return Ok(reply);
            }
            engine_debug!("Discarding stale driver reply {}", reply.id);
        }
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn navigate(&mut self, url: &Url) -> Result<(), RenderError> {
        self.current = None;
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let reply = self
            .request(
                url.as_str(),
                DriverOp::Goto {
                    url: url.as_str(),
                    timeout_ms,
                },
            )
            .await?;

        if !reply.ok {
            return Err(if reply.timeout {
                RenderError::Timeout {
                    url: url.to_string(),
                    timeout: self.timeout,
                }
            } else {
                RenderError::Navigation {
                    url: url.to_string(),
                    message: reply
                        .error
                        .unwrap_or_else(|| "navigation failed".to_string()),
                }
            });
        }
        if let Some(status) = reply.status.filter(|status| *status >= 400) {
            return Err(RenderError::HttpStatus {
                url: url.to_string(),
                status,
            });
        }

        let landed = reply.landed_on().unwrap_or_else(|| url.clone());
        engine_debug!("Browser loaded {}", landed);
        self.current = Some(landed);
        Ok(())
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot, RenderError> {
        let current = self.current.clone().ok_or_else(|| RenderError::Navigation {
            url: "about:blank".to_string(),
            message: "no page loaded".to_string(),
        })?;
        let reply = self.request(current.as_str(), DriverOp::Content).await?;
        let url = reply.landed_on().unwrap_or_else(|| current.clone());
        match reply.html {
            Some(html) if reply.ok => Ok(PageSnapshot::new(url, html)),
            _ => Err(RenderError::Navigation {
                url: current.to_string(),
                message: reply
                    .error
                    .unwrap_or_else(|| "driver returned no content".to_string()),
            }),
        }
    }

    /// Closing stdin lets the driver shut the browser down itself.
    async fn shutdown(&mut self) {
        self.stdin = None;
        self.current = None;
        let Some(mut child) = self.child.take() else {
            return;
        };
        match tokio::time::timeout(DRIVER_EXIT_GRACE, child.wait()).await {
            Ok(Ok(status)) => engine_debug!("Browser driver exited: {}", status),
            Ok(Err(err)) => engine_warn!("Waiting for browser driver failed: {}", err),
            Err(_) => {
                engine_warn!("Browser driver did not exit in time, killing it");
                if let Err(err) = child.kill().await {
                    engine_warn!("Could not kill browser driver: {}", err);
                }
            }
        }
    }

    fn close(&mut self) {
        self.stdin = None;
        self.current = None;
        if let Some(mut child) = self.child.take() {
            if let Err(err) = child.start_kill() {
                engine_debug!("Browser driver already gone: {}", err);
            }
        }
    }
}
