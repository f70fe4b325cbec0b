//! Configuration module for the bidder console.
//!
//! All configuration is loaded from environment variables with sensible defaults.
//! The client settings and the reference backend settings share one struct.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_URL: &str = "http://127.0.0.1:8080";
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CHANGE_BUFFER: usize = 64;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the console REST API
    pub api_url: String,
    /// Pre-shared key sent by the client and checked by the backend
    pub api_psk: Option<String>,
    /// Path to SQLite database file (reference backend)
    pub db_path: PathBuf,
    /// Address to bind the reference backend to
    pub bind_addr: SocketAddr,
    /// Acting user of the reference backend
    pub operator_email: String,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Client request timeout
    pub request_timeout: Duration,
    /// Capacity of the project change broadcast
    pub change_buffer: usize,
    /// Settings applied to newly created projects
    pub bidder_defaults: BidderDefaults,
}

/// Bidder and load balancer settings every new project starts with.
#[derive(Debug, Clone, PartialEq)]
pub struct BidderDefaults {
    pub vm_parameters: String,
    pub main_parameters: String,
    pub bid_interceptors: Vec<String>,
    pub impression_interceptors: Vec<String>,
    pub click_interceptors: Vec<String>,
    pub match_interceptors: Vec<String>,
    pub bidder_request_port: String,
    pub bidder_admin_port: String,
    pub load_balancer_request_port: String,
    pub load_balancer_stat_port: String,
    pub cookie_match_url: Option<String>,
}

impl Default for BidderDefaults {
    fn default() -> Self {
        Self {
            vm_parameters: "-Xmx2g -XX:+UseConcMarkSweepGC".to_string(),
            main_parameters: String::new(),
            bid_interceptors: Vec::new(),
            impression_interceptors: Vec::new(),
            click_interceptors: Vec::new(),
            match_interceptors: Vec::new(),
            bidder_request_port: "18081".to_string(),
            bidder_admin_port: "18082".to_string(),
            load_balancer_request_port: "80".to_string(),
            load_balancer_stat_port: "8081".to_string(),
            cookie_match_url: None,
        }
    }
}

impl BidderDefaults {
    /// Load bidder defaults from `CONSOLE_BIDDER_*` variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            vm_parameters: env::var("CONSOLE_BIDDER_VM_PARAMETERS")
                .unwrap_or(defaults.vm_parameters),
            main_parameters: env::var("CONSOLE_BIDDER_MAIN_PARAMETERS")
                .unwrap_or(defaults.main_parameters),
            bid_interceptors: list_var("CONSOLE_BIDDER_BID_INTERCEPTORS"),
            impression_interceptors: list_var("CONSOLE_BIDDER_IMPRESSION_INTERCEPTORS"),
            click_interceptors: list_var("CONSOLE_BIDDER_CLICK_INTERCEPTORS"),
            match_interceptors: list_var("CONSOLE_BIDDER_MATCH_INTERCEPTORS"),
            bidder_request_port: env::var("CONSOLE_BIDDER_REQUEST_PORT")
                .unwrap_or(defaults.bidder_request_port),
            bidder_admin_port: env::var("CONSOLE_BIDDER_ADMIN_PORT")
                .unwrap_or(defaults.bidder_admin_port),
            load_balancer_request_port: env::var("CONSOLE_LB_REQUEST_PORT")
                .unwrap_or(defaults.load_balancer_request_port),
            load_balancer_stat_port: env::var("CONSOLE_LB_STAT_PORT")
                .unwrap_or(defaults.load_balancer_stat_port),
            cookie_match_url: env::var("CONSOLE_COOKIE_MATCH_URL").ok(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_url = env::var("CONSOLE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());

        let api_psk = env::var("CONSOLE_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("CONSOLE_DB_PATH")
            .unwrap_or_else(|_| "./data/console.sqlite".to_string())
            .into();

        let bind_addr = parsed_var("CONSOLE_BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8080)));

        let operator_email = env::var("CONSOLE_OPERATOR_EMAIL")
            .unwrap_or_else(|_| "operator@localhost".to_string());

        let log_level = env::var("CONSOLE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let request_timeout = Duration::from_secs(
            parsed_var("CONSOLE_REQUEST_TIMEOUT_SECS", Some(DEFAULT_REQUEST_TIMEOUT_SECS))
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        );

        let change_buffer = parsed_var("CONSOLE_CHANGE_BUFFER", Some(DEFAULT_CHANGE_BUFFER))
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_CHANGE_BUFFER);

        Self {
            api_url,
            api_psk,
            db_path,
            bind_addr,
            operator_email,
            log_level,
            request_timeout,
            change_buffer,
            bidder_defaults: BidderDefaults::from_env(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_psk: None,
            db_path: PathBuf::from("./data/console.sqlite"),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            operator_email: "operator@localhost".to_string(),
            log_level: "info".to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            change_buffer: DEFAULT_CHANGE_BUFFER,
            bidder_defaults: BidderDefaults::default(),
        }
    }
}

/// Parse a variable, keeping the fallback (with a warning) when it is malformed.
fn parsed_var<T: FromStr>(name: &str, fallback: Option<T>) -> Option<T> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid {} value {:?}", name, raw);
                fallback
            }
        },
        Err(_) => fallback,
    }
}

/// Comma-separated list variable; empty entries are dropped.
fn list_var(name: &str) -> Vec<String> {
    env::var(name)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for name in [
            "CONSOLE_API_URL",
            "CONSOLE_API_PSK",
            "CONSOLE_DB_PATH",
            "CONSOLE_BIND_ADDR",
            "CONSOLE_OPERATOR_EMAIL",
            "CONSOLE_LOG_LEVEL",
            "CONSOLE_REQUEST_TIMEOUT_SECS",
            "CONSOLE_CHANGE_BUFFER",
            "CONSOLE_BIDDER_BID_INTERCEPTORS",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();

        assert_eq!(config.api_url, "http://127.0.0.1:8080");
        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/console.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.operator_email, "operator@localhost");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.change_buffer, 64);
        assert!(config.bidder_defaults.bid_interceptors.is_empty());
    }

    #[test]
    fn test_list_var_splits_and_trims() {
        env::set_var("CONSOLE_TEST_LIST_VAR", " a.B , ,c.D,");
        assert_eq!(
            list_var("CONSOLE_TEST_LIST_VAR"),
            vec!["a.B".to_string(), "c.D".to_string()]
        );
        env::remove_var("CONSOLE_TEST_LIST_VAR");
    }

    #[test]
    fn test_parsed_var_falls_back_on_garbage() {
        env::set_var("CONSOLE_TEST_PARSED_VAR", "not-a-number");
        assert_eq!(parsed_var::<u64>("CONSOLE_TEST_PARSED_VAR", Some(7)), Some(7));
        env::set_var("CONSOLE_TEST_PARSED_VAR", " 12 ");
        assert_eq!(parsed_var::<u64>("CONSOLE_TEST_PARSED_VAR", Some(7)), Some(12));
        env::remove_var("CONSOLE_TEST_PARSED_VAR");
    }
}
