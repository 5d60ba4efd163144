use std::env;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api/v1";

const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(3);
const DEFAULT_GROUP_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_RESULTS_INTERVAL: Duration = Duration::from_secs(7);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Intervals and endpoint used by the pollers.
///
/// Zero durations are not valid tick periods; [`PollingConfig::sanitized`]
/// swaps them for the defaults.
#[derive(Clone, Debug)]
pub struct PollingConfig {
    pub api_base_url: String,
    pub status_interval: Duration,
    pub group_interval: Duration,
    pub results_interval: Duration,
    pub request_timeout: Duration,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            status_interval: DEFAULT_STATUS_INTERVAL,
            group_interval: DEFAULT_GROUP_INTERVAL,
            results_interval: DEFAULT_RESULTS_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PollingConfig {
    /// Read overrides from the environment, falling back to defaults.
    ///
    /// | Variable               | Default                          |
    /// |------------------------|----------------------------------|
    /// | `DASHBOARD_API_URL`    | `http://127.0.0.1:8000/api/v1`   |
    /// | `STATUS_POLL_MS`       | `3000`                           |
    /// | `GROUP_POLL_MS`        | `5000`                           |
    /// | `RESULTS_POLL_MS`      | `7000`                           |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                             |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_or("DASHBOARD_API_URL", defaults.api_base_url),
            status_interval: env_millis("STATUS_POLL_MS", defaults.status_interval),
            group_interval: env_millis("GROUP_POLL_MS", defaults.group_interval),
            results_interval: env_millis("RESULTS_POLL_MS", defaults.results_interval),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout),
        }
        .sanitized()
    }

    pub fn with_intervals(mut self, status: Duration, group: Duration, results: Duration) -> Self {
        self.status_interval = status;
        self.group_interval = group;
        self.results_interval = results;
        self.sanitized()
    }

    pub fn sanitized(mut self) -> Self {
        if self.status_interval.is_zero() {
            self.status_interval = DEFAULT_STATUS_INTERVAL;
        }
        if self.group_interval.is_zero() {
            self.group_interval = DEFAULT_GROUP_INTERVAL;
        }
        if self.results_interval.is_zero() {
            self.results_interval = DEFAULT_RESULTS_INTERVAL;
        }
        if self.request_timeout.is_zero() {
            self.request_timeout = DEFAULT_REQUEST_TIMEOUT;
        }
        if self.api_base_url.trim().is_empty() {
            self.api_base_url = DEFAULT_API_URL.to_string();
        }
        self
    }
}

fn env_or(key: &str, fallback: String) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => fallback,
    }
}

fn env_millis(key: &str, fallback: Duration) -> Duration {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_secs(key: &str, fallback: Duration) -> Duration {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .unwrap_or(fallback),
        Err(_) => fallback,
    }
}
