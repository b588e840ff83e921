// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Shared close signal for the log source.
//!
//! The reader task owns the stream and is the only place it is dropped. Everyone else
//! (shutdown, the assembler when it exits) asks for the close through a [`SourceCloser`],
//! which the read loop observes between and during reads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct SourceCloser {
    closed: Arc<AtomicBool>,
    token: CancellationToken,
}

impl SourceCloser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the source be closed. Returns `true` only for the call that actually closed
    /// it; later calls are no-ops.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        debug!("Closing log source");
        self.token.cancel();
        true
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Resolves once [`SourceCloser::close`] has been called.
    pub async fn closed(&self) {
        self.token.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_close_is_idempotent() {
        let closer = SourceCloser::new();
        assert!(!closer.is_closed());
        assert!(closer.close());
        assert!(!closer.close());
        assert!(closer.clone().is_closed());
    }

    #[tokio::test]
    async fn test_closed_resolves_for_clones() {
        let closer = SourceCloser::new();
        let watcher = closer.clone();
        let waiter = tokio::spawn(async move { watcher.closed().await });

        closer.close();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("closed() should resolve")
            .expect("waiter task failed");
    }
}
