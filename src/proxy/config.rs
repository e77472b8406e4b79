//! Proxy configuration.
//!
//! Compile-time defaults with environment overrides, resolved once at
//! startup.

use std::time::Duration;

/// Tunables of the coordinator process.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Number of cache nodes each key is written to.
    pub replication_factor: usize,
    /// Deadline for a single outbound data call to a node.
    pub http_timeout: Duration,
    /// How often the health loop probes every registered node.
    pub health_check_period: Duration,
    /// Deadline for one health probe.
    pub probe_timeout: Duration,
    /// Virtual nodes contributed per physical node.
    pub virtual_nodes: usize,
    /// Bounds of the random pause between chaos strikes.
    pub chaos_min_interval: Duration,
    pub chaos_max_interval: Duration,
    /// The chaos controller never shrinks the cluster below this.
    pub min_surviving_nodes: usize,
}

impl ProxyConfig {
    /// Loads the configuration, letting environment variables override the
    /// defaults.
    ///
    /// # Environment Variables
    /// - `REPLICATION_FACTOR` (default: 2)
    /// - `HTTP_TIMEOUT_MS` (default: 2000)
    /// - `HEALTH_CHECK_PERIOD_SECS` (default: 3)
    /// - `VIRTUAL_NODES` (default: 50)
    /// - `CHAOS_MIN_INTERVAL_SECS` / `CHAOS_MAX_INTERVAL_SECS` (default: 5 / 8)
    /// - `MIN_SURVIVING_NODES` (default: 1)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            replication_factor: env_parse("REPLICATION_FACTOR", defaults.replication_factor).max(1),
            http_timeout: Duration::from_millis(env_parse(
                "HTTP_TIMEOUT_MS",
                defaults.http_timeout.as_millis() as u64,
            )),
            health_check_period: Duration::from_secs(env_parse(
                "HEALTH_CHECK_PERIOD_SECS",
                defaults.health_check_period.as_secs(),
            )),
            probe_timeout: defaults.probe_timeout,
            virtual_nodes: env_parse("VIRTUAL_NODES", defaults.virtual_nodes).max(10),
            chaos_min_interval: Duration::from_secs(env_parse(
                "CHAOS_MIN_INTERVAL_SECS",
                defaults.chaos_min_interval.as_secs(),
            )),
            chaos_max_interval: Duration::from_secs(env_parse(
                "CHAOS_MAX_INTERVAL_SECS",
                defaults.chaos_max_interval.as_secs(),
            )),
            min_surviving_nodes: env_parse("MIN_SURVIVING_NODES", defaults.min_surviving_nodes),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            replication_factor: 2,
            http_timeout: Duration::from_secs(2),
            health_check_period: Duration::from_secs(3),
            probe_timeout: Duration::from_secs(1),
            virtual_nodes: 50,
            chaos_min_interval: Duration::from_secs(5),
            chaos_max_interval: Duration::from_secs(8),
            min_surviving_nodes: 1,
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
