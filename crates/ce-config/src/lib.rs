use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    /// Directory holding the durable key/value files.
    pub data_dir: PathBuf,
    pub events_fixture: PathBuf,
    /// Origin of the browser portal, allowed through CORS in addition to loopback.
    pub portal_origin: Option<String>,
    pub booking_latency_ms: u64,
    pub booking_failure_rate: f64,
    /// 0 disables the timeout.
    pub booking_timeout_ms: u64,
    pub admin_enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".into(),
            data_dir: "./data".into(),
            events_fixture: "data/events.json".into(),
            portal_origin: None,
            booking_latency_ms: 400,
            booking_failure_rate: 0.12,
            booking_timeout_ms: 0,
            admin_enabled: false,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut cfg = Self::default();

        if let Some(v) = get("CE_BIND_ADDR") {
            cfg.bind_addr = v;
        }
        if let Some(v) = get("CE_DATA_DIR") {
            cfg.data_dir = v.into();
        }
        if let Some(v) = get("CE_EVENTS_FIXTURE") {
            cfg.events_fixture = v.into();
        }
        if let Some(v) = get("CE_PORTAL_ORIGIN") {
            cfg.portal_origin = Some(v);
        }
        if let Some(v) = get("CE_BOOKING_LATENCY_MS") {
            cfg.booking_latency_ms = v
                .trim()
                .parse()
                .with_context(|| format!("invalid CE_BOOKING_LATENCY_MS: {}", v))?;
        }
        if let Some(v) = get("CE_BOOKING_FAILURE_RATE") {
            let rate: f64 = v
                .trim()
                .parse()
                .with_context(|| format!("invalid CE_BOOKING_FAILURE_RATE: {}", v))?;
            if !(0.0..=1.0).contains(&rate) {
                warn!(rate, "booking failure rate out of range, clamping to [0, 1]");
            }
            cfg.booking_failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        }
        if let Some(v) = get("CE_BOOKING_TIMEOUT_MS") {
            cfg.booking_timeout_ms = v
                .trim()
                .parse()
                .with_context(|| format!("invalid CE_BOOKING_TIMEOUT_MS: {}", v))?;
        }
        if let Some(v) = get("CE_ADMIN_ENABLED") {
            cfg.admin_enabled = matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.booking_latency_ms, 400);
        assert!((cfg.booking_failure_rate - 0.12).abs() < f64::EPSILON);
        assert!(!cfg.admin_enabled);
    }

    #[test]
    fn overrides_and_empty_values() {
        let cfg = load(&[
            ("CE_BIND_ADDR", "127.0.0.1:9000"),
            ("CE_DATA_DIR", ""),
            ("CE_BOOKING_FAILURE_RATE", "1.5"),
            ("CE_ADMIN_ENABLED", "1"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:9000");
        assert_eq!(cfg.data_dir, PathBuf::from("./data"));
        assert_eq!(cfg.booking_failure_rate, 1.0);
        assert!(cfg.admin_enabled);
    }

    #[test]
    fn malformed_numbers_are_errors() {
        assert!(load(&[("CE_BOOKING_LATENCY_MS", "soon")]).is_err());
        assert!(load(&[("CE_BOOKING_TIMEOUT_MS", "-1")]).is_err());
    }
}
