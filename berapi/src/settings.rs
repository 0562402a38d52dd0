use crate::{
    context::Headers,
    error::{Error, Result},
    tracker::TrackerConfig,
};
use std::{env, time::Duration};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const BASE_URL_VAR: &str = "BERAPI_BASE_URL";
pub const TIMEOUT_VAR: &str = "BERAPI_TIMEOUT";
pub const TRACKER_CAPACITY_VAR: &str = "BERAPI_TRACKER_CAPACITY";

/// Plain configuration values of a [`Client`](crate::Client).
#[derive(Debug, Clone)]
pub struct Settings {
    base_url: Option<String>,
    headers: Headers,
    timeout: Duration,
    tracker: Option<TrackerConfig>,
}

impl Settings {
    pub fn new() -> Self {
        Self {
            base_url: None,
            headers: Headers::new(),
            timeout: DEFAULT_TIMEOUT,
            tracker: None,
        }
    }

    /// Defaults overridden by `BERAPI_BASE_URL`, `BERAPI_TIMEOUT` (seconds)
    /// and `BERAPI_TRACKER_CAPACITY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Result<Self> {
        let mut settings = Self::new();

        if let Some(base_url) = lookup(BASE_URL_VAR) {
            settings.set_base_url(base_url);
        }

        if let Some(timeout) = lookup(TIMEOUT_VAR) {
            settings.set_timeout(parse_timeout(&timeout)?);
        }

        if let Some(capacity) = lookup(TRACKER_CAPACITY_VAR) {
            let capacity = capacity.trim().parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a positive integer, got `{}`",
                    TRACKER_CAPACITY_VAR, capacity
                ))
            })?;
            let tracker = settings.tracker.take().unwrap_or_default();
            settings.set_tracker(tracker.capacity(capacity));
        }

        Ok(settings)
    }

    pub fn set_base_url<S: Into<String>>(&mut self, base_url: S) {
        self.base_url = Some(base_url.into());
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn set_header<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        self.headers.insert(name, value);
    }

    /// Headers sent with every request unless the caller overrides them.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn set_tracker(&mut self, tracker: TrackerConfig) {
        self.tracker = Some(tracker);
    }

    pub fn tracker(&self) -> Option<&TrackerConfig> {
        self.tracker.as_ref()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_timeout(value: &str) -> Result<Duration> {
    let invalid = || {
        Error::Config(format!(
            "{} must be a positive number of seconds, got `{}`",
            TIMEOUT_VAR, value
        ))
    };

    let seconds: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(invalid());
    }

    Duration::try_from_secs_f64(seconds).map_err(|_| invalid())
}
