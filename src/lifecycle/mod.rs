//! Turns the platform's app-state notifications into foreground events. The platform side is
//! abstracted by [LifecycleSource], so anything that can produce state names can drive the store:
//! stdin in the CLI, a channel in tests.

pub mod shutdown;
pub mod source;

use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use source::LifecycleSource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    Background,
    Inactive,
}

impl Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppState::Active => write!(f, "active"),
            AppState::Background => write!(f, "background"),
            AppState::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for AppState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(AppState::Active),
            "background" => Ok(AppState::Background),
            "inactive" => Ok(AppState::Inactive),
            other => Err(anyhow!("Unknown app state {other:?}")),
        }
    }
}

/// Remembers the last reported state. Only coming back to `active` from `background` or
/// `inactive` counts as a foreground transition.
#[derive(Debug)]
pub struct ForegroundDetector {
    current: AppState,
}

impl Default for ForegroundDetector {
    fn default() -> Self {
        Self::new(AppState::Active)
    }
}

impl ForegroundDetector {
    pub fn new(initial: AppState) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> AppState {
        self.current
    }

    /// Returns true if `next` brings the app to the foreground.
    pub fn observe(&mut self, next: AppState) -> bool {
        let previous = std::mem::replace(&mut self.current, next);
        matches!(
            (previous, next),
            (AppState::Background | AppState::Inactive, AppState::Active)
        )
    }
}

pub struct LifecycleModule {
    source: Box<dyn LifecycleSource>,
    detector: ForegroundDetector,
    shutdown: CancellationToken,
}

impl LifecycleModule {
    pub fn new(source: Box<dyn LifecycleSource>, shutdown: CancellationToken) -> Self {
        Self {
            source,
            detector: ForegroundDetector::default(),
            shutdown,
        }
    }

    /// Pulls states until the source runs dry or shutdown is requested, calling `on_foreground`
    /// for every foreground transition. Returns how many transitions were seen.
    pub async fn run(mut self, mut on_foreground: impl FnMut()) -> Result<usize> {
        let mut foregrounds = 0;
        loop {
            let next = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Lifecycle stopped by shutdown");
                    return Ok(foregrounds);
                }
                next = self.source.next_state() => next?,
            };

            let Some(raw) = next else {
                info!("Lifecycle source ended");
                return Ok(foregrounds);
            };

            let state = match raw.parse::<AppState>() {
                Ok(state) => state,
                Err(e) => {
                    warn!("Skipping state: {e}");
                    continue;
                }
            };

            let previous = self.detector.current();
            if self.detector.observe(state) {
                debug!("Foreground transition {previous} -> {state}");
                foregrounds += 1;
                on_foreground();
            } else {
                debug!("Ignoring transition {previous} -> {state}");
            }
        }
    }
}
