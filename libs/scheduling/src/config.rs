//! Engine configuration from `TARLA_*` environment variables.

use std::time::Duration;

use tarla_reconcile::{DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL, DEFAULT_RETRY_WINDOW};
use thiserror::Error;

use crate::error::SchedulingResult;
use crate::segment::{PlanWindowSegmenter, DEFAULT_SEGMENT_SIZE_DONUM, DEFAULT_SEGMENT_THRESHOLD_DONUM};

/// Queue the replan worker consumes by default.
pub const DEFAULT_REPLAN_QUEUE: &str = "mission.replan";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulingConfig {
    pub segment_threshold_donum: u32,
    pub segment_size_donum: u32,
    pub replan_queue: String,
    pub poll_interval: Duration,
    pub replan_max_retries: u32,
    pub replan_retry_window: Duration,
    pub log_level: String,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            segment_threshold_donum: DEFAULT_SEGMENT_THRESHOLD_DONUM,
            segment_size_donum: DEFAULT_SEGMENT_SIZE_DONUM,
            replan_queue: DEFAULT_REPLAN_QUEUE.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            replan_max_retries: DEFAULT_MAX_RETRIES,
            replan_retry_window: DEFAULT_RETRY_WINDOW,
            log_level: "info".to_string(),
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let segment_threshold_donum = parse_or(
            &lookup,
            "TARLA_SEGMENT_THRESHOLD_DONUM",
            defaults.segment_threshold_donum,
        )?;

        let segment_size_donum = parse_or(&lookup, "TARLA_SEGMENT_SIZE_DONUM", defaults.segment_size_donum)?;
        if segment_size_donum == 0 {
            return Err(ConfigError::Invalid {
                var: "TARLA_SEGMENT_SIZE_DONUM",
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let replan_queue = lookup("TARLA_REPLAN_QUEUE").unwrap_or(defaults.replan_queue);

        let poll_interval = Duration::from_millis(parse_or(
            &lookup,
            "TARLA_POLL_INTERVAL_MS",
            defaults.poll_interval.as_millis() as u64,
        )?);

        let replan_max_retries = parse_or(&lookup, "TARLA_REPLAN_MAX_RETRIES", defaults.replan_max_retries)?;

        let replan_retry_window = Duration::from_secs(parse_or(
            &lookup,
            "TARLA_REPLAN_RETRY_WINDOW_SECS",
            defaults.replan_retry_window.as_secs(),
        )?);

        let log_level = lookup("TARLA_LOG_LEVEL").unwrap_or(defaults.log_level);

        Ok(Self {
            segment_threshold_donum,
            segment_size_donum,
            replan_queue,
            poll_interval,
            replan_max_retries,
            replan_retry_window,
            log_level,
        })
    }

    pub fn segmenter(&self) -> SchedulingResult<PlanWindowSegmenter> {
        PlanWindowSegmenter::new(self.segment_threshold_donum, self.segment_size_donum)
    }
}

fn parse_or<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
