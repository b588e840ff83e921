// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;

use crate::constants;
use crate::emitter::RetryStrategy;
use crate::errors::ReceiverError;
use crate::record::Resource;

/// Configuration for a log stream receiver
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// How often pending records are flushed; zero emits every record on its own
    pub flush_interval: Duration,
    /// Flush early once this many records are pending
    pub max_batch_records: usize,
    /// Lines longer than this are discarded
    pub max_line_bytes: usize,
    pub retry_strategy: RetryStrategy,
    /// Attributes attached to every batch
    pub resource: Resource,
    /// Instrumentation scope name attached to every batch
    pub scope_name: String,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
    /// How long shutdown waits for in-flight records to drain
    pub shutdown_timeout: Duration,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            flush_interval: constants::DEFAULT_FLUSH_INTERVAL,
            max_batch_records: constants::MAX_BATCH_RECORDS,
            max_line_bytes: constants::MAX_LINE_BYTES,
            retry_strategy: RetryStrategy::default(),
            resource: Resource::default(),
            scope_name: constants::TYPE_ID.to_string(),
            log_level: "info".to_string(),
            shutdown_timeout: constants::DEFAULT_SHUTDOWN_TIMEOUT,
        }
    }
}

impl ReceiverConfig {
    /// Create configuration from `STDIN_LOGS_*` environment variables
    pub fn from_env() -> Result<Self, ReceiverError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup. Unset or unparsable numeric values
    /// fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ReceiverError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse_u64 = |key: &str| lookup(key).and_then(|val| val.trim().parse::<u64>().ok());

        let flush_interval = parse_u64("STDIN_LOGS_FLUSH_INTERVAL_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.flush_interval);
        let max_batch_records = parse_u64("STDIN_LOGS_MAX_BATCH_RECORDS")
            .map(|val| val as usize)
            .unwrap_or(defaults.max_batch_records);
        let max_line_bytes = parse_u64("STDIN_LOGS_MAX_LINE_BYTES")
            .map(|val| val as usize)
            .unwrap_or(defaults.max_line_bytes);

        let max_attempts = parse_u64("STDIN_LOGS_SINK_MAX_ATTEMPTS").unwrap_or(1);
        let retry_strategy = match parse_u64("STDIN_LOGS_SINK_RETRY_BACKOFF_MS") {
            Some(delay_ms) if delay_ms > 0 => RetryStrategy::LinearBackoff(max_attempts, delay_ms),
            _ => RetryStrategy::Immediate(max_attempts),
        };

        let resource = lookup("STDIN_LOGS_RESOURCE_ATTRIBUTES")
            .map(|val| Resource::from_env_string(&val))
            .unwrap_or_default();
        let scope_name = lookup("STDIN_LOGS_SCOPE_NAME")
            .map(|val| val.trim().to_string())
            .unwrap_or(defaults.scope_name);
        let log_level = lookup("STDIN_LOGS_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);
        let shutdown_timeout = parse_u64("STDIN_LOGS_SHUTDOWN_TIMEOUT_MS")
            .map(Duration::from_millis)
            .unwrap_or(defaults.shutdown_timeout);

        let config = Self {
            flush_interval,
            max_batch_records,
            max_line_bytes,
            retry_strategy,
            resource,
            scope_name,
            log_level,
            shutdown_timeout,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ReceiverError> {
        if self.max_batch_records == 0 {
            return Err(ReceiverError::InvalidConfig(
                "max batch records must be greater than 0".to_string(),
            ));
        }

        // the shortest valid line is longer than this anyway
        if self.max_line_bytes < 3 {
            return Err(ReceiverError::InvalidConfig(format!(
                "max line bytes must be at least 3, got {}",
                self.max_line_bytes
            )));
        }

        if self.scope_name.is_empty() {
            return Err(ReceiverError::InvalidConfig(
                "scope name cannot be empty".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(ReceiverError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}
