// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

mod logger;

use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as TokioMutex;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use stdin_logs::{
    config::ReceiverConfig,
    emitter::LogsSink,
    errors::{ReceiverError, SinkError},
    receiver::{Host, Receiver},
    record::Batch,
};

/// Writes every record as one JSON object per line on stdout.
struct StdoutSink {
    out: TokioMutex<tokio::io::Stdout>,
}

impl StdoutSink {
    fn new() -> Self {
        Self {
            out: TokioMutex::new(tokio::io::stdout()),
        }
    }
}

#[async_trait]
impl LogsSink for StdoutSink {
    async fn consume_logs(&self, batch: &Batch) -> Result<(), SinkError> {
        let mut buf = Vec::new();
        for record in batch.records() {
            let line = json!({
                "timestamp": record.timestamp(),
                "severity_text": record.severity_text(),
                "severity_number": record.severity().number(),
                "body": record.body(),
                "resource": batch.resource().attributes,
                "scope": batch.scope(),
            });
            serde_json::to_writer(&mut buf, &line)
                .map_err(|e| SinkError::Permanent(e.to_string()))?;
            buf.push(b'\n');
        }

        let mut out = self.out.lock().await;
        out.write_all(&buf)
            .await
            .map_err(|e| SinkError::Transient(e.to_string()))?;
        out.flush()
            .await
            .map_err(|e| SinkError::Transient(e.to_string()))
    }
}

/// Logs fatal errors and wakes up `main` so it can shut down.
struct ProcessHost {
    fatal: CancellationToken,
    failed: AtomicBool,
}

impl Host for ProcessHost {
    fn report_fatal_error(&self, error: ReceiverError) {
        error!("Fatal error in log receiver: {}", error);
        self.failed.store(true, Ordering::SeqCst);
        self.fatal.cancel();
    }
}

#[tokio::main]
pub async fn main() {
    let log_level = env::var("STDIN_LOGS_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(log_level).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .event_format(logger::Formatter)
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match ReceiverConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Error creating config on log receiver startup: {e}");
            std::process::exit(1);
        }
    };

    let fatal = CancellationToken::new();
    let host = Arc::new(ProcessHost {
        fatal: fatal.clone(),
        failed: AtomicBool::new(false),
    });

    let shutdown_timeout = config.shutdown_timeout;
    let mut receiver = Receiver::from_stdin(config, Arc::new(StdoutSink::new()));
    if let Err(e) = receiver.start(&CancellationToken::new(), host.clone()) {
        error!("Failed to start log receiver: {e}");
        std::process::exit(1);
    }

    tokio::select! {
        () = receiver.stopped() => debug!("Log receiver finished reading input"),
        () = fatal.cancelled() => debug!("Stopping after fatal error"),
        _ = tokio::signal::ctrl_c() => info!("Received interrupt, shutting down"),
    }

    let deadline = CancellationToken::new();
    let timer = deadline.clone();
    tokio::spawn(async move {
        sleep(shutdown_timeout).await;
        timer.cancel();
    });

    let result = receiver.shutdown(&deadline).await;
    // fatal errors were already logged by the host
    if let Err(e) = &result {
        if !host.failed.load(Ordering::SeqCst) {
            error!("Log receiver did not shut down cleanly: {e}");
        }
    }

    let code = if result.is_err() || host.failed.load(Ordering::SeqCst) {
        1
    } else {
        0
    };
    // a pending stdin read holds a blocking thread the runtime would wait on
    std::process::exit(code);
}
