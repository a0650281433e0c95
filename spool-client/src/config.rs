//! Client configuration

use std::time::Duration;

/// Client configuration for connecting to the farm controller
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Controller base URL (e.g., "http://localhost:5000")
    pub base_url: String,

    /// Push channel TCP address (e.g., "127.0.0.1:5055")
    pub push_addr: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Polling fallback intervals
    pub poll: PollConfig,

    /// Stale horizons for cached collections
    pub staleness: StalenessConfig,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            push_addr: None,
            timeout: 30,
            poll: PollConfig::default(),
            staleness: StalenessConfig::default(),
        }
    }

    /// Set the push channel TCP address
    pub fn with_push_addr(mut self, addr: impl Into<String>) -> Self {
        self.push_addr = Some(addr.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the polling fallback configuration
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Set the staleness configuration
    pub fn with_staleness(mut self, staleness: StalenessConfig) -> Self {
        self.staleness = staleness;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> super::HttpClient {
        super::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5000")
    }
}

/// Polling fallback intervals
///
/// Ticks only enqueue refreshes for collections past their stale horizon,
/// so a healthy push channel keeps the poller effectively idle.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub enabled: bool,
    /// Printer/stats poll tick
    pub printers_interval: Duration,
    /// Job queue and preset poll tick
    pub jobs_interval: Duration,
}

impl PollConfig {
    /// Turn the polling fallback off (push channel only)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Set the printer/stats tick
    pub fn with_printers_interval(mut self, interval: Duration) -> Self {
        self.printers_interval = interval;
        self
    }

    /// Set the job queue tick
    pub fn with_jobs_interval(mut self, interval: Duration) -> Self {
        self.jobs_interval = interval;
        self
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            printers_interval: Duration::from_secs(5),
            jobs_interval: Duration::from_secs(15),
        }
    }
}

/// Stale-after horizon per cached collection
///
/// A collection older than its horizon is still served from the cache;
/// reading it merely enqueues a background refresh.
#[derive(Debug, Clone)]
pub struct StalenessConfig {
    pub printers: Duration,
    pub jobs: Duration,
    pub stats: Duration,
    pub presets: Duration,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            printers: Duration::from_secs(10),
            jobs: Duration::from_secs(30),
            stats: Duration::from_secs(60),
            presets: Duration::from_secs(600),
        }
    }
}
