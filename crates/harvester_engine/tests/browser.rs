#![cfg(unix)]

mod common;

use std::fs;
use std::path::Path;

use harvester_engine::{
    BrowserLauncher, BrowserSettings, HarvestSettings, Launcher, RenderError, RenderSession,
    Renderer,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use url::Url;

/// Line-protocol driver standing in for Playwright. The page at `/item`
/// gains its image on the second DOM read, like a lazily rendered gallery.
const FAKE_DRIVER: &str = r#"
printf '%s\n' '{"id":0,"ok":true}'
reads=0
while IFS= read -r line; do
  id=$(printf '%s' "$line" | sed 's/.*"id":\([0-9]*\).*/\1/')
  case "$line" in
    *'"op":"goto"'*'/slow'*)
      printf '%s\n' "{\"id\":$id,\"ok\":false,\"timeout\":true,\"error\":\"Timeout exceeded\"}" ;;
    *'"op":"goto"'*'/gone'*)
      printf '%s\n' "{\"id\":$id,\"ok\":true,\"status\":410,\"url\":\"https://catalog.test/gone\"}" ;;
    *'"op":"goto"'*)
      printf '%s\n' "{\"id\":$id,\"ok\":true,\"status\":200,\"url\":\"https://catalog.test/item\"}" ;;
    *'"op":"content"'*)
      reads=$((reads + 1))
      if [ "$reads" -eq 1 ]; then
        html='<main></main>'
      else
        html='<main><img itemprop=\"image\" src=\"/late.jpg\"></main>'
      fi
      printf '%s\n' "{\"id\":$id,\"ok\":true,\"url\":\"https://catalog.test/item\",\"html\":\"$html\"}" ;;
  esac
done
"#;

fn settings_with_driver(dir: &Path, script: &str) -> HarvestSettings {
    let driver = dir.join("driver.sh");
    fs::write(&driver, script).unwrap();
    HarvestSettings {
        navigation_timeout_ms: 2_000,
        browser: BrowserSettings {
            program: "sh".to_string(),
            driver_script: Some(driver),
            headless: true,
            launch_timeout_ms: 5_000,
        },
        ..HarvestSettings::default()
    }
}

fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
}

#[tokio::test]
async fn later_snapshot_sees_content_rendered_after_load() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let settings = settings_with_driver(temp.path(), FAKE_DRIVER);
    let mut renderer = BrowserLauncher::new(&settings).launch().await.unwrap();

    renderer.navigate(&url("https://catalog.test/item")).await.unwrap();
    let early = renderer.snapshot().await.unwrap();
    let late = renderer.snapshot().await.unwrap();

    assert_eq!(early.url.as_str(), "https://catalog.test/item");
    assert!(early.select_first("img").unwrap().is_none());
    let img = late.select_first(r#"img[itemprop="image"]"#).unwrap().unwrap();
    assert_eq!(img.attr("src"), Some("/late.jpg"));

    renderer.shutdown().await;
}

#[tokio::test]
async fn driver_timeouts_and_error_statuses_are_mapped() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let settings = settings_with_driver(temp.path(), FAKE_DRIVER);
    let mut renderer = BrowserLauncher::new(&settings).launch().await.unwrap();

    let err = renderer
        .navigate(&url("https://catalog.test/slow"))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    // Nothing was loaded, so there is nothing to read.
    assert!(renderer.snapshot().await.is_err());

    let gone = url("https://catalog.test/gone");
    let err = renderer.navigate(&gone).await.unwrap_err();
    assert_eq!(
        err,
        RenderError::HttpStatus {
            url: gone.to_string(),
            status: 410
        }
    );

    renderer.shutdown().await;
}

#[tokio::test]
async fn released_session_refuses_further_navigation() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let settings = settings_with_driver(temp.path(), FAKE_DRIVER);
    let mut renderer = BrowserLauncher::new(&settings).launch().await.unwrap();

    renderer.shutdown().await;
    let err = renderer
        .navigate(&url("https://catalog.test/item"))
        .await
        .unwrap_err();
    assert!(matches!(err, RenderError::Navigation { .. }));

    // A session around a fresh renderer releases it without a panic.
    let renderer = BrowserLauncher::new(&settings).launch().await.unwrap();
    RenderSession::new(renderer).release().await;
}

#[tokio::test]
async fn driver_that_exits_early_fails_the_launch() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let settings = settings_with_driver(temp.path(), "exit 0\n");

    let err = BrowserLauncher::new(&settings).launch().await.unwrap_err();
    assert!(matches!(err, RenderError::Launch(msg) if msg.contains("driver exited")));
}

#[tokio::test]
async fn driver_reporting_a_startup_error_fails_the_launch() {
    common::init_logging();
    let temp = TempDir::new().unwrap();
    let settings = settings_with_driver(
        temp.path(),
        "printf '%s\\n' '{\"id\":0,\"ok\":false,\"error\":\"Cannot find module playwright\"}'\n",
    );

    let err = BrowserLauncher::new(&settings).launch().await.unwrap_err();
    assert!(matches!(err, RenderError::Launch(msg) if msg.contains("Cannot find module")));
}

#[tokio::test]
async fn missing_interpreter_fails_the_launch() {
    let settings = HarvestSettings {
        browser: BrowserSettings {
            program: "/nonexistent/catalog-harvester-node".to_string(),
            ..BrowserSettings::default()
        },
        ..HarvestSettings::default()
    };

    let err = BrowserLauncher::new(&settings).launch().await.unwrap_err();
    assert!(matches!(err, RenderError::Launch(_)));
}
