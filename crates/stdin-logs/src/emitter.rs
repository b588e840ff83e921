// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::errors::{ReceiverError, SinkError};
use crate::record::Batch;

/// Downstream consumer of completed batches.
///
/// The receiver awaits each call before making the next one, so implementations never see
/// two deliveries at once.
#[async_trait]
pub trait LogsSink {
    async fn consume_logs(&self, batch: &Batch) -> Result<(), SinkError>;
}

/// How many times a batch is offered to the sink and how long to wait in between.
///
/// Only [`SinkError::Transient`] failures are attempted again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryStrategy {
    /// Up to `n` attempts, back to back.
    Immediate(u64),
    /// Up to `n` attempts, waiting `delay_ms * attempt` before each retry.
    LinearBackoff(u64, u64),
}

impl Default for RetryStrategy {
    fn default() -> Self {
        RetryStrategy::Immediate(1)
    }
}

impl RetryStrategy {
    fn max_attempts(&self) -> u64 {
        match self {
            RetryStrategy::Immediate(n) | RetryStrategy::LinearBackoff(n, _) => (*n).max(1),
        }
    }

    fn delay_before(&self, attempt: u64) -> Option<Duration> {
        match self {
            RetryStrategy::Immediate(_) => None,
            RetryStrategy::LinearBackoff(_, delay_ms) => {
                Some(Duration::from_millis(delay_ms.saturating_mul(attempt)))
            }
        }
    }
}

/// Delivers batches to the sink, one at a time.
pub struct Emitter {
    sink: Arc<dyn LogsSink + Send + Sync>,
    retry_strategy: RetryStrategy,
    // Cancelled once shutdown gave up waiting; nothing is delivered after that
    halt: CancellationToken,
    delivered_batches: u64,
    delivered_records: u64,
}

impl Emitter {
    pub fn new(
        sink: Arc<dyn LogsSink + Send + Sync>,
        retry_strategy: RetryStrategy,
        halt: CancellationToken,
    ) -> Self {
        Emitter {
            sink,
            retry_strategy,
            halt,
            delivered_batches: 0,
            delivered_records: 0,
        }
    }

    /// Hands `batch` to the sink. A failure that survives the retry strategy is returned as
    /// [`ReceiverError::SinkDelivery`] and should stop ingestion.
    ///
    /// The halt token is raced against every attempt, with the halt checked first, so a
    /// halted emitter never starts a new delivery and abandons one it is waiting on. A sink
    /// call already polled before the halt may still have done part of its work.
    pub async fn emit(&mut self, batch: Batch) -> Result<(), ReceiverError> {
        let max_attempts = self.retry_strategy.max_attempts();
        let mut attempt = 1;

        loop {
            let delivery = tokio::select! {
                biased;
                () = self.halt.cancelled() => {
                    warn!(
                        "Dropping batch of {} records: receiver already shut down",
                        batch.len()
                    );
                    return Ok(());
                }
                result = self.sink.consume_logs(&batch) => result,
            };

            match delivery {
                Ok(()) => {
                    self.delivered_batches += 1;
                    self.delivered_records += batch.len() as u64;
                    debug!("Delivered batch of {} records", batch.len());
                    return Ok(());
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        "Sink delivery attempt {}/{} failed, retrying: {}",
                        attempt, max_attempts, e
                    );
                    if let Some(delay) = self.retry_strategy.delay_before(attempt) {
                        tokio::select! {
                            () = self.halt.cancelled() => {}
                            () = tokio::time::sleep(delay) => {}
                        }
                    }
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Failed to deliver batch of {} records after {} attempt(s): {}",
                        batch.len(),
                        attempt,
                        e
                    );
                    return Err(ReceiverError::SinkDelivery(e));
                }
            }
        }
    }

    pub fn delivered_batches(&self) -> u64 {
        self.delivered_batches
    }

    pub fn delivered_records(&self) -> u64 {
        self.delivered_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{LogRecord, Resource, Scope};
    use crate::test_support::RecordingSink;

    fn batch_of(bodies: &[&str]) -> Batch {
        let records = bodies
            .iter()
            .enumerate()
            .map(|(i, body)| LogRecord::new(i as u64, "INFO".to_string(), body.to_string()))
            .collect();
        Batch::new(Resource::default(), Scope::new("test"), records).unwrap()
    }

    #[tokio::test]
    async fn test_emit_delivers_batch() {
        let sink = Arc::new(RecordingSink::default());
        let mut emitter = Emitter::new(sink.clone(), RetryStrategy::default(), CancellationToken::new());

        emitter.emit(batch_of(&["a", "b"])).await.unwrap();

        assert_eq!(sink.batches().len(), 1);
        assert_eq!(emitter.delivered_batches(), 1);
        assert_eq!(emitter.delivered_records(), 2);
    }

    #[tokio::test]
    async fn test_emit_failure_is_fatal_by_default() {
        let sink = Arc::new(RecordingSink::failing(vec![SinkError::Transient("busy".into())]));
        let mut emitter = Emitter::new(sink.clone(), RetryStrategy::default(), CancellationToken::new());

        let result = emitter.emit(batch_of(&["a"])).await;

        assert!(matches!(result, Err(ReceiverError::SinkDelivery(SinkError::Transient(_)))));
        assert_eq!(sink.attempts(), 1);
        assert!(sink.batches().is_empty());
    }

    #[tokio::test]
    async fn test_emit_retries_transient_failures() {
        let sink = Arc::new(RecordingSink::failing(vec![
            SinkError::Transient("busy".into()),
            SinkError::Transient("still busy".into()),
        ]));
        let mut emitter = Emitter::new(sink.clone(), RetryStrategy::Immediate(3), CancellationToken::new());

        emitter.emit(batch_of(&["a"])).await.unwrap();

        assert_eq!(sink.attempts(), 3);
        assert_eq!(sink.batches().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_linear_backoff_gives_up() {
        let sink = Arc::new(RecordingSink::failing(vec![
            SinkError::Transient("busy".into()),
            SinkError::Transient("busy".into()),
            SinkError::Transient("busy".into()),
        ]));
        let mut emitter = Emitter::new(
            sink.clone(),
            RetryStrategy::LinearBackoff(2, 100),
            CancellationToken::new(),
        );

        let started = tokio::time::Instant::now();
        let result = emitter.emit(batch_of(&["a"])).await;

        assert!(matches!(result, Err(ReceiverError::SinkDelivery(_))));
        assert_eq!(sink.attempts(), 2);
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_emit_does_not_retry_permanent_failures() {
        let sink = Arc::new(RecordingSink::failing(vec![SinkError::Permanent("bad".into())]));
        let mut emitter = Emitter::new(sink.clone(), RetryStrategy::Immediate(5), CancellationToken::new());

        let result = emitter.emit(batch_of(&["a"])).await;

        assert!(matches!(result, Err(ReceiverError::SinkDelivery(SinkError::Permanent(_)))));
        assert_eq!(sink.attempts(), 1);
    }

    #[tokio::test]
    async fn test_emit_drops_batches_after_halt() {
        let sink = Arc::new(RecordingSink::default());
        let halt = CancellationToken::new();
        let mut emitter = Emitter::new(sink.clone(), RetryStrategy::default(), halt.clone());

        halt.cancel();
        emitter.emit(batch_of(&["a"])).await.unwrap();

        assert_eq!(sink.attempts(), 0);
        assert_eq!(emitter.delivered_batches(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_abandons_delivery_when_halted() {
        let sink = Arc::new(RecordingSink::with_delay(Duration::from_secs(60)));
        let halt = CancellationToken::new();
        let mut emitter = Emitter::new(sink.clone(), RetryStrategy::default(), halt.clone());

        let trigger = halt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = tokio::time::Instant::now();
        emitter.emit(batch_of(&["a"])).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(sink.attempts(), 1);
        assert!(sink.batches().is_empty());
        assert_eq!(emitter.delivered_batches(), 0);

        // a later batch never reaches the sink
        emitter.emit(batch_of(&["b"])).await.unwrap();
        assert_eq!(sink.attempts(), 1);
    }
}
