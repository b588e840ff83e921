// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error types for line parsing, sink delivery and the receiver lifecycle.

use std::io;
use std::sync::Arc;

/// Why a single line could not be turned into a log record.
///
/// Every variant is local to one line: the scanner logs it and moves on.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("line too short: {0:?}")]
    LineTooShort(String),

    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    #[error("expected integer version followed by a comma: {0:?}")]
    MalformedVersionToken(String),

    #[error("unsupported version: {0}")]
    UnsupportedVersion(i64),

    #[error("invalid payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// The payload is valid JSON but not a `[timestamp, severity, message]` array.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("expected array, got {got}")]
    ExpectedArray { got: &'static str },

    #[error("missing {field}")]
    Missing { field: &'static str },

    #[error("expected {expected} for {field}, got {got}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
        got: &'static str,
    },

    #[error("too many values, got {got}")]
    TooManyValues { got: usize },
}

/// Failure returned by a [`crate::emitter::LogsSink`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// The sink may accept the same batch if asked again.
    #[error("transient sink failure: {0}")]
    Transient(String),

    #[error("sink rejected batch: {0}")]
    Permanent(String),
}

impl SinkError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SinkError::Transient(_))
    }
}

/// Errors surfaced by the receiver, either from its lifecycle calls or through
/// [`crate::receiver::Host::report_fatal_error`].
///
/// Cloneable so a background failure can go to the host and still be returned from
/// shutdown.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReceiverError {
    #[error("failed to read log stream: {0}")]
    StreamIo(#[source] Arc<io::Error>),

    #[error("failed to deliver batch: {0}")]
    SinkDelivery(#[from] SinkError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("receiver already started")]
    AlreadyStarted,

    #[error("operation cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    TaskFailed(String),
}

impl From<io::Error> for ReceiverError {
    fn from(e: io::Error) -> Self {
        ReceiverError::StreamIo(Arc::new(e))
    }
}
