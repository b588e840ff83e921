// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Receiver for newline-delimited, version-tagged log lines.
//!
//! A [`receiver::Receiver`] reads a byte stream (usually stdin), parses every line into a
//! [`record::LogRecord`], groups records into [`record::Batch`]es and hands each batch to a
//! [`emitter::LogsSink`]. Malformed lines are logged and skipped; stream and sink failures are
//! reported to the injected [`receiver::Host`].
//!
//! ```text
//!   source ──> scanner ──> parser ──(rendezvous)──> assembler ──> emitter ──> sink
//!   └────────────── reader task ──────────────┘    └────── assembler task ──────┘
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod assembler;
pub mod config;
pub mod constants;
pub mod emitter;
pub mod errors;
pub mod parser;
pub mod receiver;
pub mod record;
pub mod scanner;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;
