// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Mock sink and host for exercising a receiver end to end

use std::sync::Mutex;
use std::time::Duration;

use stdin_logs::emitter::LogsSink;
use stdin_logs::errors::{ReceiverError, SinkError};
use stdin_logs::receiver::Host;
use stdin_logs::record::{Batch, LogRecord};

/// Mock sink that keeps every batch it accepts
#[derive(Default)]
pub struct MockSink {
    batches: Mutex<Vec<Batch>>,
    reject_with: Option<SinkError>,
    delay: Option<Duration>,
}

#[allow(dead_code)]
impl MockSink {
    pub fn rejecting(error: SinkError) -> Self {
        Self {
            reject_with: Some(error),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.batches()
            .iter()
            .flat_map(|batch| batch.records().iter().map(LogRecord::body).map(String::from))
            .collect()
    }
}

#[async_trait::async_trait]
impl LogsSink for MockSink {
    async fn consume_logs(&self, batch: &Batch) -> Result<(), SinkError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = &self.reject_with {
            return Err(error.clone());
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

/// Mock host that records fatal errors instead of stopping anything
#[derive(Default)]
pub struct MockHost {
    errors: Mutex<Vec<String>>,
}

impl MockHost {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Host for MockHost {
    fn report_fatal_error(&self, error: ReceiverError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}
