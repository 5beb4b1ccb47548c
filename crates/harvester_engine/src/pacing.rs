use std::sync::Arc;

use async_trait::async_trait;
use engine_logging::engine_debug;

use crate::PacingSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    /// Before reading a freshly loaded detail page.
    Settle,
    /// After an item is recorded.
    Cooldown,
}

/// Deliberate waits that bound the request rate to the remote origin.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, pace: Pace);
}

#[async_trait]
impl<P: Pacer + ?Sized> Pacer for Arc<P> {
    async fn pause(&self, pace: Pace) {
        self.as_ref().pause(pace).await;
    }
}

/// Sleeps for a uniformly random duration from the configured range.
#[derive(Debug, Clone)]
pub struct RandomPacer {
    settings: PacingSettings,
}

impl RandomPacer {
    pub fn new(settings: PacingSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Pacer for RandomPacer {
    async fn pause(&self, pace: Pace) {
        let range = match pace {
            Pace::Settle => self.settings.settle,
            Pace::Cooldown => self.settings.cooldown,
        };
        let delay = range.sample(&mut rand::rng());
        if delay.is_zero() {
            return;
        }
        engine_debug!("Pausing {:?} ({:?})", delay, pace);
        tokio::time::sleep(delay).await;
    }
}
