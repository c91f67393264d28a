//! Configuration Module
//!
//! Handles loading and managing gateway configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::upstream::atb::DEFAULT_ATB_URL;
use crate::upstream::entur::DEFAULT_ENTUR_URL;

/// Gateway configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Bus stop TTL in seconds
    pub stops_ttl: u64,
    /// Departure TTL in seconds, shared by forecasts and journeys
    pub departures_ttl: u64,
    /// Background sweep interval in seconds
    pub sweep_interval: u64,
    /// Upstream HTTP timeout in seconds
    pub upstream_timeout: u64,
    /// Serialize concurrent misses on the same key
    pub coalesce_misses: bool,
    /// Allow cross-origin GET requests
    pub cors: bool,
    pub atb_url: String,
    pub atb_username: String,
    pub atb_password: String,
    pub entur_url: String,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8080)
    /// - `STOPS_TTL` - Bus stop TTL in seconds (default: 604800)
    /// - `DEPARTURES_TTL` - Departure TTL in seconds (default: 60)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 60)
    /// - `UPSTREAM_TIMEOUT` - Upstream timeout in seconds (default: 10)
    /// - `COALESCE_MISSES` - Coalesce concurrent misses (default: false)
    /// - `CORS` - Enable permissive CORS (default: false)
    /// - `ATB_URL`, `ATB_USERNAME`, `ATB_PASSWORD` - AtB SOAP service
    /// - `ENTUR_URL` - Entur journey planner
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a Config from an arbitrary variable source.
    ///
    /// Missing or unparseable values fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let number = |key: &str, default: u64| parse_or(lookup(key), default);
        let positive = |key: &str, default: u64| match number(key, default) {
            0 => default,
            n => n,
        };

        Self {
            server_port: parse_or(lookup("SERVER_PORT"), defaults.server_port),
            stops_ttl: number("STOPS_TTL", defaults.stops_ttl),
            departures_ttl: number("DEPARTURES_TTL", defaults.departures_ttl),
            sweep_interval: positive("SWEEP_INTERVAL", defaults.sweep_interval),
            upstream_timeout: positive("UPSTREAM_TIMEOUT", defaults.upstream_timeout),
            coalesce_misses: parse_flag(lookup("COALESCE_MISSES"), defaults.coalesce_misses),
            cors: parse_flag(lookup("CORS"), defaults.cors),
            atb_url: lookup("ATB_URL").unwrap_or(defaults.atb_url),
            atb_username: lookup("ATB_USERNAME").unwrap_or(defaults.atb_username),
            atb_password: lookup("ATB_PASSWORD").unwrap_or(defaults.atb_password),
            entur_url: lookup("ENTUR_URL").unwrap_or(defaults.entur_url),
        }
    }

    pub fn stops_ttl(&self) -> Duration {
        Duration::from_secs(self.stops_ttl)
    }

    pub fn departures_ttl(&self) -> Duration {
        Duration::from_secs(self.departures_ttl)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            stops_ttl: 604_800,
            departures_ttl: 60,
            sweep_interval: 60,
            upstream_timeout: 10,
            coalesce_misses: false,
            cors: false,
            atb_url: DEFAULT_ATB_URL.to_string(),
            atb_username: String::new(),
            atb_password: String::new(),
            entur_url: DEFAULT_ENTUR_URL.to_string(),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn parse_flag(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim) {
        Some("1") | Some("true") | Some("yes") => true,
        Some("0") | Some("false") | Some("no") => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.stops_ttl(), Duration::from_secs(168 * 60 * 60));
        assert_eq!(config.departures_ttl(), Duration::from_secs(60));
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
        assert!(!config.coalesce_misses);
        assert!(!config.cors);
        assert_eq!(config.atb_url, DEFAULT_ATB_URL);
        assert_eq!(config.entur_url, DEFAULT_ENTUR_URL);
    }

    #[test]
    fn test_config_from_empty_lookup() {
        assert_eq!(Config::from_lookup(|_| None), Config::default());
    }

    #[test]
    fn test_config_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "3000"),
            ("STOPS_TTL", "3600"),
            ("DEPARTURES_TTL", "30"),
            ("COALESCE_MISSES", "true"),
            ("CORS", "1"),
            ("ATB_USERNAME", "atb"),
            ("ENTUR_URL", "http://localhost:9000/graphql"),
        ]));

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.stops_ttl(), Duration::from_secs(3600));
        assert_eq!(config.departures_ttl(), Duration::from_secs(30));
        assert!(config.coalesce_misses);
        assert!(config.cors);
        assert_eq!(config.atb_username, "atb");
        assert_eq!(config.atb_password, "");
        assert_eq!(config.entur_url, "http://localhost:9000/graphql");
    }

    #[test]
    fn test_config_invalid_values_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "99999"),
            ("STOPS_TTL", "a week"),
            ("SWEEP_INTERVAL", "0"),
            ("UPSTREAM_TIMEOUT", "-1"),
            ("CORS", "maybe"),
        ]));

        assert_eq!(config.server_port, 8080);
        assert_eq!(config.stops_ttl, 604_800);
        assert_eq!(config.sweep_interval, 60);
        assert_eq!(config.upstream_timeout, 10);
        assert!(!config.cors);
    }
}
