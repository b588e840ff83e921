// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Sink and host doubles shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::emitter::LogsSink;
use crate::errors::{ReceiverError, SinkError};
use crate::receiver::Host;
use crate::record::Batch;

/// Records every accepted batch. Queued failures are returned, in order, before any batch
/// is accepted.
#[derive(Default)]
pub(crate) struct RecordingSink {
    batches: Mutex<Vec<Batch>>,
    failures: Mutex<VecDeque<SinkError>>,
    attempts: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    delay: Option<Duration>,
}

impl RecordingSink {
    pub(crate) fn failing(failures: Vec<SinkError>) -> Self {
        Self {
            failures: Mutex::new(failures.into()),
            ..Default::default()
        }
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub(crate) fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogsSink for RecordingSink {
    async fn consume_logs(&self, batch: &Batch) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self.failures.lock().unwrap().pop_front();
        let result = match failure {
            Some(e) => Err(e),
            None => {
                self.batches.lock().unwrap().push(batch.clone());
                Ok(())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Keeps the message of every reported fatal error.
#[derive(Default)]
pub(crate) struct RecordingHost {
    errors: Mutex<Vec<String>>,
}

impl RecordingHost {
    pub(crate) fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Host for RecordingHost {
    fn report_fatal_error(&self, error: ReceiverError) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}
