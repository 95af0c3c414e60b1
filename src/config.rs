//! Runtime configuration from `COSTATUS_*` environment variables
//!
//! | variable                       | default             |
//! |--------------------------------|---------------------|
//! | `COSTATUS_OPERATOR_NAMES`      | required (a, b, c)  |
//! | `COSTATUS_EXPECTED_NAME`       | unset (any label)   |
//! | `COSTATUS_NAMESPACE`           | unset (all)         |
//! | `COSTATUS_PROBE_INTERVAL_SECS` | 60 (must be > 0)    |
//! | `COSTATUS_CHANNEL_SIZE`        | 64                  |
//! | `COSTATUS_RESYNC_PERIOD_SECS`  | 300 (must be > 0)   |
//! | `COSTATUS_HEALTH_PORT`         | 8080                |

use crate::controller::monitor::DEFAULT_PROBE_INTERVAL;
use crate::controller::notification::DEFAULT_CHANNEL_SIZE;
use crate::controller::watch::DEFAULT_RESYNC_PERIOD;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_HEALTH_PORT: u16 = 8080;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no operator names configured, set COSTATUS_OPERATOR_NAMES")]
    NoOperatorNames,

    #[error("invalid value {value:?} for {var}")]
    InvalidValue { var: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// ClusterOperators to seed and keep up to date
    pub operator_names: Vec<String>,
    /// Strict mode: only CSVs labelled with exactly this name are handled
    pub expected_name: Option<String>,
    /// Watch CSVs in this namespace only
    pub namespace: Option<String>,
    pub probe_interval: Duration,
    pub channel_size: usize,
    pub resync_period: Duration,
    pub health_port: u16,
}

impl MonitorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let expected_name = non_empty("COSTATUS_EXPECTED_NAME").map(|v| v.trim().to_string());
        let mut operator_names = non_empty("COSTATUS_OPERATOR_NAMES")
            .map(|v| split_names(&v))
            .unwrap_or_default();
        if operator_names.is_empty() {
            match &expected_name {
                Some(name) => operator_names.push(name.clone()),
                None => return Err(ConfigError::NoOperatorNames),
            }
        }

        Ok(MonitorConfig {
            operator_names,
            expected_name,
            namespace: non_empty("COSTATUS_NAMESPACE").map(|v| v.trim().to_string()),
            probe_interval: parse_period(
                "COSTATUS_PROBE_INTERVAL_SECS",
                non_empty("COSTATUS_PROBE_INTERVAL_SECS"),
            )?
            .unwrap_or(DEFAULT_PROBE_INTERVAL),
            channel_size: parse("COSTATUS_CHANNEL_SIZE", non_empty("COSTATUS_CHANNEL_SIZE"))?
                .unwrap_or(DEFAULT_CHANNEL_SIZE),
            resync_period: parse_period(
                "COSTATUS_RESYNC_PERIOD_SECS",
                non_empty("COSTATUS_RESYNC_PERIOD_SECS"),
            )?
            .unwrap_or(DEFAULT_RESYNC_PERIOD),
            health_port: parse("COSTATUS_HEALTH_PORT", non_empty("COSTATUS_HEALTH_PORT"))?
                .unwrap_or(DEFAULT_HEALTH_PORT),
        })
    }
}

fn parse<T: FromStr>(var: &'static str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|v| {
            v.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var,
                value: v.clone(),
            })
        })
        .transpose()
}

/// Whole seconds, must be at least one
fn parse_period(
    var: &'static str,
    value: Option<String>,
) -> Result<Option<Duration>, ConfigError> {
    match parse::<u64>(var, value)? {
        Some(0) => Err(ConfigError::InvalidValue {
            var,
            value: "0".to_string(),
        }),
        secs => Ok(secs.map(Duration::from_secs)),
    }
}

/// Split a comma separated name list, trimming and dropping empty entries
pub fn split_names(names: &str) -> Vec<String> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
