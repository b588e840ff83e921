// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Start and shutdown of an ingestion session.
//!
//! [`Receiver::start`] spawns two tasks and returns at once:
//!
//! - the reader task runs a [`LineScanner`] over the source and hands every parsed record
//!   to the assembler through a single-slot channel;
//! - the assembler task runs a [`BatchAssembler`] that batches records and delivers them
//!   through an [`Emitter`].
//!
//! Stream and sink failures are reported to the [`Host`] as soon as they happen, and the
//! first of them is returned again from [`Receiver::shutdown`].

use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::assembler::{AssemblerConfig, BatchAssembler};
use crate::config::ReceiverConfig;
use crate::constants::{HANDOFF_CAPACITY, TYPE_ID};
use crate::emitter::{Emitter, LogsSink};
use crate::errors::ReceiverError;
use crate::scanner::LineScanner;
use crate::source::SourceCloser;

/// Runtime that embeds the receiver and is told about failures it cannot recover from.
pub trait Host: Send + Sync {
    fn report_fatal_error(&self, error: ReceiverError);
}

/// State of an ingestion session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NotStarted,
    /// Background tasks are reading and delivering.
    Running,
    /// Shutdown was requested and the source is closed.
    ShuttingDown,
    /// Background tasks have finished, or shutdown gave up waiting for them.
    Stopped,
}

type TaskHandle = JoinHandle<Result<(), ReceiverError>>;

pub struct Receiver<R> {
    config: ReceiverConfig,
    sink: Arc<dyn LogsSink + Send + Sync>,
    source: Option<R>,
    closer: SourceCloser,
    halt: CancellationToken,
    // Cancelled once both background tasks are gone, however they ended
    finished: CancellationToken,
    tasks: Vec<TaskHandle>,
    state: SessionState,
    span: Span,
}

impl Receiver<tokio::io::Stdin> {
    /// Receiver reading the process's standard input.
    pub fn from_stdin(config: ReceiverConfig, sink: Arc<dyn LogsSink + Send + Sync>) -> Self {
        Self::new(config, tokio::io::stdin(), sink)
    }
}

impl<R> Receiver<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(config: ReceiverConfig, source: R, sink: Arc<dyn LogsSink + Send + Sync>) -> Self {
        Self {
            config,
            sink,
            source: Some(source),
            closer: SourceCloser::new(),
            halt: CancellationToken::new(),
            finished: CancellationToken::new(),
            tasks: Vec::new(),
            state: SessionState::NotStarted,
            span: tracing::info_span!("receiver", type_id = TYPE_ID),
        }
    }

    /// Replaces the span both background tasks are instrumented with.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn state(&self) -> SessionState {
        if self.state == SessionState::Running && self.finished.is_cancelled() {
            return SessionState::Stopped;
        }
        self.state
    }

    /// Resolves once both background tasks have finished, for example at end of input or
    /// after a fatal error. Stays pending until [`Receiver::start`] succeeds.
    pub async fn stopped(&self) {
        self.finished.cancelled().await;
    }

    /// Spawns the reader and assembler tasks.
    ///
    /// Fails with [`ReceiverError::AlreadyStarted`] on a second call and with
    /// [`ReceiverError::Cancelled`] when `ctx` is already cancelled. Failures found after this
    /// returns are reported to `host`.
    pub fn start(&mut self, ctx: &CancellationToken, host: Arc<dyn Host>) -> Result<(), ReceiverError> {
        if self.state != SessionState::NotStarted {
            return Err(ReceiverError::AlreadyStarted);
        }
        if ctx.is_cancelled() {
            return Err(ReceiverError::Cancelled);
        }
        self.config.validate()?;
        let source = self.source.take().ok_or(ReceiverError::AlreadyStarted)?;

        let (records_tx, records_rx) = mpsc::channel(HANDOFF_CAPACITY);
        // Dropped by whichever task ends last
        let finished = Arc::new(self.finished.clone().drop_guard());

        let scanner = LineScanner::new(
            source,
            records_tx,
            self.closer.clone(),
            self.config.max_line_bytes,
        );
        let reader_host = Arc::clone(&host);
        let reader_finished = Arc::clone(&finished);
        let reader = tokio::spawn(
            async move {
                let _finished = reader_finished;
                match scanner.run().await {
                    Ok(outcome) => {
                        debug!("Reader task finished: {:?}", outcome);
                        Ok(())
                    }
                    Err(e) => {
                        error!("Log stream failed: {}", e);
                        reader_host.report_fatal_error(e.clone());
                        Err(e)
                    }
                }
            }
            .instrument(self.span.clone()),
        );

        let emitter = Emitter::new(
            Arc::clone(&self.sink),
            self.config.retry_strategy,
            self.halt.clone(),
        );
        let assembler = BatchAssembler::new(
            records_rx,
            emitter,
            AssemblerConfig::from(&self.config),
        );
        let closer = self.closer.clone();
        let assembler = tokio::spawn(
            async move {
                let _finished = finished;
                let result = assembler.run().await;
                // Nothing consumes records any more, stop reading
                closer.close();
                match &result {
                    Ok(()) => debug!("Assembler task finished"),
                    Err(e) => host.report_fatal_error(e.clone()),
                }
                result
            }
            .instrument(self.span.clone()),
        );

        self.tasks = vec![reader, assembler];
        self.state = SessionState::Running;
        self.span.in_scope(|| {
            info!(
                "Log receiver started, flush interval {:?}",
                self.config.flush_interval
            )
        });
        Ok(())
    }

    /// Closes the source and waits for everything already read to be delivered, or for
    /// `ctx` to be cancelled, whichever comes first.
    ///
    /// Returns [`ReceiverError::Cancelled`] when `ctx` wins; the tasks are left to finish on
    /// their own but nothing more reaches the sink. Otherwise returns the first stream or
    /// sink failure the tasks reported, if any. Safe to call before `start` and more than
    /// once; only the first call after `start` reports an outcome.
    pub async fn shutdown(&mut self, ctx: &CancellationToken) -> Result<(), ReceiverError> {
        if matches!(
            self.state,
            SessionState::NotStarted | SessionState::Stopped
        ) {
            return Ok(());
        }

        let span = self.span.clone();
        self.drain(ctx).instrument(span).await
    }

    async fn drain(&mut self, ctx: &CancellationToken) -> Result<(), ReceiverError> {
        self.state = SessionState::ShuttingDown;
        if !self.closer.close() {
            debug!("Log source was already closed");
        }

        let mut tasks = std::mem::take(&mut self.tasks);
        let result = tokio::select! {
            biased;
            result = join_tasks(&mut tasks) => result,
            () = ctx.cancelled() => {
                self.halt.cancel();
                warn!("Shutdown cancelled before the log receiver drained, dropping pending records");
                Err(ReceiverError::Cancelled)
            }
        };

        self.state = SessionState::Stopped;
        match &result {
            Ok(()) => info!("Log receiver stopped"),
            Err(ReceiverError::Cancelled) => {}
            Err(e) => info!("Log receiver stopped after a failure: {}", e),
        }
        result
    }
}

/// Waits for every task and keeps the first failure, in spawn order.
async fn join_tasks(tasks: &mut [TaskHandle]) -> Result<(), ReceiverError> {
    let mut failure = None;
    for task in tasks.iter_mut() {
        let result = match task.await {
            Ok(result) => result,
            Err(e) => {
                error!("Log receiver task failed: {}", e);
                Err(ReceiverError::TaskFailed(e.to_string()))
            }
        };
        if let Err(e) = result {
            failure.get_or_insert(e);
        }
    }
    failure.map_or(Ok(()), Err)
}
