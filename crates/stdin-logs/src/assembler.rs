// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Groups parsed records into batches and hands them to the [`Emitter`].
//!
//! A batch is flushed when the flush timer fires, when it reaches `max_batch_records`, or
//! when the scanner side of the hand-off closes. A zero flush interval turns batching off:
//! every record is emitted on its own as soon as it arrives.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::config::ReceiverConfig;
use crate::emitter::Emitter;
use crate::errors::ReceiverError;
use crate::record::{Batch, LogRecord, Resource, Scope};

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    pub flush_interval: Duration,
    pub max_batch_records: usize,
    pub resource: Resource,
    pub scope: Scope,
}

impl From<&ReceiverConfig> for AssemblerConfig {
    fn from(config: &ReceiverConfig) -> Self {
        Self {
            flush_interval: config.flush_interval,
            max_batch_records: config.max_batch_records,
            resource: config.resource.clone(),
            scope: Scope::new(config.scope_name.as_str()),
        }
    }
}

pub struct BatchAssembler {
    records: mpsc::Receiver<LogRecord>,
    emitter: Emitter,
    config: AssemblerConfig,
    pending: Vec<LogRecord>,
}

impl BatchAssembler {
    pub fn new(records: mpsc::Receiver<LogRecord>, emitter: Emitter, config: AssemblerConfig) -> Self {
        Self {
            records,
            emitter,
            config,
            pending: Vec::new(),
        }
    }

    /// Runs until the hand-off closes and the last batch is flushed, or until a delivery
    /// fails.
    pub async fn run(mut self) -> Result<(), ReceiverError> {
        let result = if self.config.flush_interval.is_zero() {
            self.run_immediate().await
        } else {
            self.run_batched().await
        };
        debug!(
            batches = self.emitter.delivered_batches(),
            records = self.emitter.delivered_records(),
            "Batch assembler stopped"
        );
        result
    }

    async fn run_immediate(&mut self) -> Result<(), ReceiverError> {
        while let Some(record) = self.records.recv().await {
            self.pending.push(record);
            self.flush().await?;
        }
        Ok(())
    }

    async fn run_batched(&mut self) -> Result<(), ReceiverError> {
        let period = self.config.flush_interval;
        // first tick one full period from now, not immediately
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush().await?;
                }
                record = self.records.recv() => match record {
                    Some(record) => {
                        self.pending.push(record);
                        if self.pending.len() >= self.config.max_batch_records {
                            self.flush().await?;
                            ticker.reset();
                        }
                    }
                    None => {
                        debug!("Record hand-off closed, flushing remaining records");
                        return self.flush().await;
                    }
                }
            }
        }
    }

    async fn flush(&mut self) -> Result<(), ReceiverError> {
        if self.pending.is_empty() {
            trace!("Nothing to flush");
            return Ok(());
        }

        let records = std::mem::take(&mut self.pending);
        match Batch::new(self.config.resource.clone(), self.config.scope.clone(), records) {
            Some(batch) => self.emitter.emit(batch).await,
            None => Ok(()),
        }
    }
}
