// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Line scanner feeding parsed records into the assembler hand-off.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::errors::{ParseError, ReceiverError};
use crate::parser::parse_line;
use crate::record::LogRecord;
use crate::source::SourceCloser;

/// How a scan ended without a stream failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The source reported end of input.
    EndOfStream,
    /// The source was closed on purpose, usually by shutdown.
    Closed,
    /// The assembler stopped accepting records.
    ConsumerGone,
}

enum LineRead {
    Line { truncated: bool },
    EndOfStream,
    Closed,
}

/// Reads newline-delimited lines from a source and forwards every parsed record.
///
/// Malformed lines are logged and skipped. The scanner owns the source and drops it when
/// [`LineScanner::run`] returns.
pub struct LineScanner<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
    max_line_bytes: usize,
    records: mpsc::Sender<LogRecord>,
    closer: SourceCloser,
    accepted: u64,
    rejected: u64,
}

impl<R> LineScanner<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        source: R,
        records: mpsc::Sender<LogRecord>,
        closer: SourceCloser,
        max_line_bytes: usize,
    ) -> Self {
        Self {
            reader: BufReader::new(source),
            line: Vec::new(),
            max_line_bytes,
            records,
            closer,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Scans until end of input, an expected close, or a read failure.
    ///
    /// A read error that happens after the source was closed counts as an expected close.
    pub async fn run(mut self) -> Result<ScanOutcome, ReceiverError> {
        let result = self.scan().await;
        debug!(
            accepted = self.accepted,
            rejected = self.rejected,
            "Log scanner finished: {:?}",
            result
        );
        result
    }

    async fn scan(&mut self) -> Result<ScanOutcome, ReceiverError> {
        let closer = self.closer.clone();
        loop {
            let truncated = match self.read_line(&closer).await {
                Ok(LineRead::Line { truncated }) => truncated,
                Ok(LineRead::EndOfStream) => return Ok(ScanOutcome::EndOfStream),
                Ok(LineRead::Closed) => return Ok(ScanOutcome::Closed),
                Err(e) if closer.is_closed() => {
                    debug!("Read failed after the source was closed: {}", e);
                    return Ok(ScanOutcome::Closed);
                }
                Err(e) => return Err(ReceiverError::from(e)),
            };

            if self.line.is_empty() && !truncated {
                continue;
            }

            let parsed = if truncated {
                Err(ParseError::LineTooLong {
                    limit: self.max_line_bytes,
                })
            } else {
                parse_line(&self.line)
            };

            match parsed {
                Ok(record) => {
                    trace!(timestamp = record.timestamp(), "Parsed log record");
                    self.accepted += 1;
                    // Blocks until the assembler takes the record
                    if self.records.send(record).await.is_err() {
                        return Ok(ScanOutcome::ConsumerGone);
                    }
                }
                Err(e) => {
                    self.rejected += 1;
                    warn!("Skipping malformed log line: {}", e);
                }
            }
        }
    }

    /// Reads the next line into `self.line`, without its `\n` or `\r\n` terminator.
    ///
    /// Lines longer than `max_line_bytes` come back with `truncated` set; the excess is
    /// consumed and discarded so memory stays bounded.
    ///
    /// Closing the source only interrupts a read that would have to wait. Bytes already
    /// buffered, or that the source hands over without waiting, are still split into lines.
    /// A partial line left over at that point is dropped.
    async fn read_line(&mut self, closer: &SourceCloser) -> io::Result<LineRead> {
        self.line.clear();
        let mut truncated = false;
        let mut read_any = false;

        loop {
            if self.reader.buffer().is_empty() {
                tokio::select! {
                    biased;
                    filled = self.reader.fill_buf() => {
                        filled?;
                    }
                    () = closer.closed() => return Ok(LineRead::Closed),
                }
            }

            let available = self.reader.buffer();
            if available.is_empty() {
                // a final line without a newline still counts
                if !read_any {
                    return Ok(LineRead::EndOfStream);
                }
                let truncated = self.finish_line(truncated);
                return Ok(LineRead::Line { truncated });
            }
            read_any = true;

            let (chunk, consumed, done) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (&available[..i], i + 1, true),
                None => (available, available.len(), false),
            };

            let room = self.max_line_bytes.saturating_sub(self.line.len());
            if chunk.len() > room {
                truncated = true;
                self.line.extend_from_slice(&chunk[..room]);
            } else {
                self.line.extend_from_slice(chunk);
            }
            self.reader.consume(consumed);

            if done {
                let truncated = self.finish_line(truncated);
                return Ok(LineRead::Line { truncated });
            }
        }
    }

    fn finish_line(&mut self, truncated: bool) -> bool {
        if !truncated && self.line.last() == Some(&b'\r') {
            self.line.pop();
        }
        truncated
    }
}
