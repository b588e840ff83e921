// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

/// Component type identifier, also the default instrumentation scope name.
pub const TYPE_ID: &str = "pg_otel_logs";

/// Default interval between timer-driven flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

// Same cap the logs intake applies per batch
pub const MAX_BATCH_RECORDS: usize = 1000;

/// Longest line the scanner accepts before discarding it, matching the default token
/// size of a buffered line scanner.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Capacity of the scanner -> assembler hand-off. One slot keeps the producer in lock step
/// with the consumer.
pub(crate) const HANDOFF_CAPACITY: usize = 1;

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
