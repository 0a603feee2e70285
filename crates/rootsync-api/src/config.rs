//! Configuration for the rootsync service.

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use rootsync_publisher::{BackoffStrategy, LedgerConfig, PublisherConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

const CONFIG_FILE: &str = "config.toml";

/// Complete service configuration with defaults, file, and environment
/// overrides.
///
/// Configuration is loaded in priority order:
/// 1. Environment variables (highest priority)
/// 2. Configuration file (`config.toml`)
/// 3. Built-in defaults (lowest priority)
///
/// Ledger credentials (`CONTRACT_ADDRESS`, `SIGNER_ADDRESS`) have no
/// defaults and must be supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Storage
    /// Directory holding `whitelist.json` and `publication.json`.
    ///
    /// Environment variable: `DATA_DIR`
    #[serde(default = "default_data_dir", alias = "DATA_DIR")]
    pub data_dir: PathBuf,

    // Server
    /// Server bind address.
    ///
    /// Environment variable: `HOST`
    #[serde(default = "default_host", alias = "HOST")]
    pub host: String,
    /// Server bind port.
    ///
    /// Environment variable: `PORT`
    #[serde(default = "default_port", alias = "PORT")]
    pub port: u16,
    /// HTTP request timeout in seconds. Must cover a full publication, see
    /// [`Config::publication_budget`].
    ///
    /// Environment variable: `REQUEST_TIMEOUT`
    #[serde(default = "default_request_timeout", alias = "REQUEST_TIMEOUT")]
    pub request_timeout: u64,

    // Ledger
    /// JSON-RPC endpoint of the ledger node.
    ///
    /// Environment variable: `RPC_URL`
    #[serde(default = "default_rpc_url", alias = "RPC_URL")]
    pub rpc_url: String,
    /// Contract that stores the root.
    ///
    /// Environment variable: `CONTRACT_ADDRESS`
    #[serde(default, alias = "CONTRACT_ADDRESS")]
    pub contract_address: String,
    /// Node-managed account that sends the root transaction.
    ///
    /// Environment variable: `SIGNER_ADDRESS`
    #[serde(default, alias = "SIGNER_ADDRESS")]
    pub signer_address: String,
    /// Interval between receipt polls in milliseconds.
    ///
    /// Environment variable: `RECEIPT_POLL_INTERVAL_MS`
    #[serde(default = "default_receipt_poll_interval_ms", alias = "RECEIPT_POLL_INTERVAL_MS")]
    pub receipt_poll_interval_ms: u64,
    /// How long to wait for a root transaction to be mined, in seconds.
    ///
    /// Environment variable: `RECEIPT_TIMEOUT_SECONDS`
    #[serde(default = "default_receipt_timeout", alias = "RECEIPT_TIMEOUT_SECONDS")]
    pub receipt_timeout_seconds: u64,

    // Publication
    /// Timeout for a single publication attempt in seconds.
    ///
    /// Environment variable: `PUBLISH_TIMEOUT_SECONDS`
    #[serde(default = "default_publish_timeout", alias = "PUBLISH_TIMEOUT_SECONDS")]
    pub publish_timeout_seconds: u64,
    /// Maximum publication attempts per root.
    ///
    /// Environment variable: `MAX_PUBLISH_ATTEMPTS`
    #[serde(default = "default_publish_attempts", alias = "MAX_PUBLISH_ATTEMPTS")]
    pub max_publish_attempts: u32,
    /// Base delay for exponential backoff in milliseconds.
    ///
    /// Environment variable: `RETRY_BASE_DELAY_MS`
    #[serde(default = "default_base_delay_ms", alias = "RETRY_BASE_DELAY_MS")]
    pub retry_base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    ///
    /// Environment variable: `RETRY_MAX_DELAY_MS`
    #[serde(default = "default_max_delay_ms", alias = "RETRY_MAX_DELAY_MS")]
    pub retry_max_delay_ms: u64,
    /// Jitter factor for retry timing (0.0 to 1.0).
    ///
    /// Environment variable: `RETRY_JITTER_FACTOR`
    #[serde(default = "default_jitter_factor", alias = "RETRY_JITTER_FACTOR")]
    pub retry_jitter_factor: f64,
    /// Seconds between background resync checks.
    ///
    /// Environment variable: `RESYNC_INTERVAL_SECONDS`
    #[serde(default = "default_resync_interval", alias = "RESYNC_INTERVAL_SECONDS")]
    pub resync_interval_seconds: u64,

    // Logging
    /// Log level configuration.
    ///
    /// Environment variable: `RUST_LOG`
    #[serde(default = "default_log_level", alias = "RUST_LOG")]
    pub rust_log: String,
}

impl Config {
    /// Load configuration from defaults, config file, and environment variable
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if a source cannot be parsed or a value is invalid.
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed(""));

        let config: Self = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Ledger client settings.
    pub fn to_ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            rpc_url: self.rpc_url.clone(),
            contract_address: self.contract_address.clone(),
            signer_address: self.signer_address.clone(),
            request_timeout: Duration::from_secs(self.publish_timeout_seconds),
            receipt_poll_interval: Duration::from_millis(self.receipt_poll_interval_ms),
            receipt_timeout: Duration::from_secs(self.receipt_timeout_seconds),
        }
    }

    /// Convert to retry policy.
    pub fn to_retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_publish_attempts,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            jitter_factor: self.retry_jitter_factor,
            backoff_strategy: BackoffStrategy::Exponential,
        }
    }

    /// Publisher settings.
    ///
    /// One attempt covers both the send and the receipt wait.
    pub fn to_publisher_config(&self) -> PublisherConfig {
        PublisherConfig {
            attempt_timeout: Duration::from_secs(
                self.publish_timeout_seconds.saturating_add(self.receipt_timeout_seconds),
            ),
            retry_policy: self.to_retry_policy(),
        }
    }

    /// Longest a single publication can take: every attempt timing out, plus
    /// the maximum backoff (with jitter) between attempts.
    pub fn publication_budget(&self) -> Duration {
        let attempts = self.max_publish_attempts;
        let attempt_timeout = self.to_publisher_config().attempt_timeout;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
        let jitter_ms =
            (self.retry_max_delay_ms as f64 * self.retry_jitter_factor.clamp(0.0, 1.0)).ceil() as u64;
        let max_backoff =
            Duration::from_millis(self.retry_max_delay_ms.saturating_add(jitter_ms));

        attempt_timeout.saturating_mul(attempts)
            + max_backoff.saturating_mul(attempts.saturating_sub(1))
    }

    /// Interval of the background reconciler.
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_seconds)
    }

    /// Parse server socket address from host and port configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn parse_server_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.host, self.port);
        SocketAddr::from_str(&addr_str).context("Invalid server address")
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("port must be greater than 0");
        }

        if self.max_publish_attempts == 0 {
            anyhow::bail!("max_publish_attempts must be greater than 0");
        }

        if !(0.0..=1.0).contains(&self.retry_jitter_factor) {
            anyhow::bail!("retry_jitter_factor must be between 0.0 and 1.0");
        }

        if self.retry_base_delay_ms > self.retry_max_delay_ms {
            anyhow::bail!("retry_base_delay_ms cannot exceed retry_max_delay_ms");
        }

        if self.publish_timeout_seconds == 0 || self.receipt_timeout_seconds == 0 {
            anyhow::bail!("publish and receipt timeouts must be greater than 0");
        }

        if self.receipt_poll_interval_ms == 0 {
            anyhow::bail!("receipt_poll_interval_ms must be greater than 0");
        }

        if self.resync_interval_seconds == 0 {
            anyhow::bail!("resync_interval_seconds must be greater than 0");
        }

        let budget = self.publication_budget();
        if Duration::from_secs(self.request_timeout) < budget {
            anyhow::bail!(
                "request_timeout ({}s) must cover the publication budget ({}s)",
                self.request_timeout,
                budget.as_secs_f64().ceil()
            );
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            host: default_host(),
            port: default_port(),
            request_timeout: default_request_timeout(),
            rpc_url: default_rpc_url(),
            contract_address: String::new(),
            signer_address: String::new(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            receipt_timeout_seconds: default_receipt_timeout(),
            publish_timeout_seconds: default_publish_timeout(),
            max_publish_attempts: default_publish_attempts(),
            retry_base_delay_ms: default_base_delay_ms(),
            retry_max_delay_ms: default_max_delay_ms(),
            retry_jitter_factor: default_jitter_factor(),
            resync_interval_seconds: default_resync_interval(),
            rust_log: default_log_level(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    600
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_receipt_poll_interval_ms() -> u64 {
    1000
}

fn default_receipt_timeout() -> u64 {
    60
}

fn default_publish_timeout() -> u64 {
    15
}

fn default_publish_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    30000
}

fn default_jitter_factor() -> f64 {
    0.2
}

fn default_resync_interval() -> u64 {
    30
}

fn default_log_level() -> String {
    "info,rootsync=debug,tower_http=debug".to_string()
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, env, sync::Mutex};

    use super::*;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    struct TestEnvGuard {
        _lock: std::sync::MutexGuard<'static, ()>,
        vars: Vec<String>,
        originals: HashMap<String, Option<String>>,
    }

    impl TestEnvGuard {
        fn new() -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            Self { _lock: lock, vars: Vec::new(), originals: HashMap::new() }
        }

        fn set_var(&mut self, key: &str, value: &str) {
            if !self.vars.contains(&key.to_string()) {
                self.originals.insert(key.to_string(), env::var(key).ok());
                self.vars.push(key.to_string());
            }
            env::set_var(key, value);
        }
    }

    impl Drop for TestEnvGuard {
        fn drop(&mut self) {
            for var in &self.vars {
                match self.originals.get(var) {
                    Some(Some(value)) => env::set_var(var, value),
                    Some(None) => env::remove_var(var),
                    None => {},
                }
            }
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();

        assert!(config.validate().is_ok());
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.to_retry_policy().max_attempts, 5);
        assert_eq!(config.to_publisher_config().attempt_timeout, Duration::from_secs(75));
    }

    #[test]
    fn env_overrides_apply() {
        let mut guard = TestEnvGuard::new();
        guard.set_var("DATA_DIR", "/var/lib/rootsync");
        guard.set_var("PORT", "9090");
        guard.set_var("RPC_URL", "https://rpc.example.com");
        guard.set_var("CONTRACT_ADDRESS", "0x00000000000000000000000000000000000000c0");
        guard.set_var("SIGNER_ADDRESS", "0x00000000000000000000000000000000000000a1");
        guard.set_var("MAX_PUBLISH_ATTEMPTS", "8");
        guard.set_var("RETRY_BASE_DELAY_MS", "250");
        guard.set_var("RESYNC_INTERVAL_SECONDS", "5");
        guard.set_var("REQUEST_TIMEOUT", "900");

        let config = Config::load().expect("config should load with env overrides");

        assert_eq!(config.data_dir, PathBuf::from("/var/lib/rootsync"));
        assert_eq!(config.port, 9090);
        assert_eq!(config.request_timeout, 900);
        assert_eq!(config.resync_interval(), Duration::from_secs(5));

        let ledger = config.to_ledger_config();
        assert_eq!(ledger.rpc_url, "https://rpc.example.com");
        assert!(ledger.validate().is_ok());

        let policy = config.to_retry_policy();
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }

    #[test]
    fn invalid_config_validation_fails() {
        let mut config = Config { port: 0, ..Config::default() };
        assert!(config.validate().is_err());

        config = Config { max_publish_attempts: 0, ..Config::default() };
        assert!(config.validate().is_err());

        config = Config { retry_jitter_factor: 1.5, ..Config::default() };
        assert!(config.validate().is_err());

        config = Config { retry_base_delay_ms: 10_000, retry_max_delay_ms: 100, ..Config::default() };
        assert!(config.validate().is_err());

        config = Config { resync_interval_seconds: 0, ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn request_timeout_must_cover_publication() {
        let config = Config::default();
        // 5 attempts of 75s, plus 4 backoffs of at most 36s.
        assert_eq!(config.publication_budget().as_secs(), 519);
        assert!(Duration::from_secs(config.request_timeout) >= config.publication_budget());

        let short = Config { request_timeout: 300, ..Config::default() };
        let err = short.validate().unwrap_err();
        assert!(err.to_string().contains("publication budget"));

        let fewer_attempts =
            Config { request_timeout: 300, max_publish_attempts: 3, ..Config::default() };
        assert!(fewer_attempts.validate().is_ok());
    }

    #[test]
    fn socket_address_parsing() {
        let config = Config { host: "127.0.0.1".to_string(), port: 9000, ..Config::default() };

        let addr = config.parse_server_addr().expect("Should parse socket address");

        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }
}
