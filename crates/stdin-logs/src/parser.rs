// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoding of version-tagged log lines.
//!
//! A line looks like `<version>,<payload>`. Only version 1 is understood, whose payload is a
//! JSON array `[timestamp, severity, message]`:
//!
//! ```text
//! 1,[1656581409,"ERROR","relation \"users\" does not exist"]
//! ```

use serde_json::Value;

use crate::errors::{ParseError, ShapeError};
use crate::record::LogRecord;

// Longest slice of an offending line quoted back in an error
const PREVIEW_BYTES: usize = 64;

/// Parses one line (without its trailing newline) into a log record.
///
/// # Examples
///
/// ```
/// use stdin_logs::parser::parse_line;
///
/// let record = parse_line(br#"1,[12345,"INFO","some message"]"#).unwrap();
/// assert_eq!(record.timestamp(), 12345);
/// assert_eq!(record.severity_text(), "INFO");
/// assert_eq!(record.body(), "some message");
///
/// assert!(parse_line(b"2,[]").is_err());
/// ```
pub fn parse_line(line: &[u8]) -> Result<LogRecord, ParseError> {
    if line.len() < 3 {
        return Err(ParseError::LineTooShort(preview(line)));
    }

    if line.starts_with(b"1,") {
        return parse_v1(&line[2..]);
    }

    match leading_version(line) {
        Some(version) => Err(ParseError::UnsupportedVersion(version)),
        None => Err(ParseError::MalformedVersionToken(preview(line))),
    }
}

/// Decodes a version 1 payload. The whole input must be exactly one three element array;
/// trailing content is rejected.
pub fn parse_v1(payload: &[u8]) -> Result<LogRecord, ParseError> {
    let value: Value = serde_json::from_slice(payload)?;
    let values = match value {
        Value::Array(values) => values,
        other => {
            return Err(ShapeError::ExpectedArray {
                got: kind(&other),
            }
            .into())
        }
    };

    let total = values.len();
    let mut values = values.into_iter();

    let timestamp = match values.next() {
        Some(value) => value.as_u64().ok_or_else(|| ShapeError::WrongType {
            field: "timestamp",
            expected: "integer",
            got: kind(&value),
        })?,
        None => return Err(ShapeError::Missing { field: "timestamp" }.into()),
    };
    let severity_text = take_string(values.next(), "severity")?;
    let body = take_string(values.next(), "message")?;

    if values.next().is_some() {
        return Err(ShapeError::TooManyValues { got: total }.into());
    }

    Ok(LogRecord::new(timestamp, severity_text, body))
}

fn take_string(value: Option<Value>, field: &'static str) -> Result<String, ShapeError> {
    match value {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(ShapeError::WrongType {
            field,
            expected: "string",
            got: kind(&other),
        }),
        None => Err(ShapeError::Missing { field }),
    }
}

/// Reads a leading, optionally signed, decimal integer that is immediately followed by a
/// comma.
fn leading_version(line: &[u8]) -> Option<i64> {
    let (negative, rest) = match line.first() {
        Some(b'-') => (true, &line[1..]),
        Some(b'+') => (false, &line[1..]),
        _ => (false, line),
    };
    let digits = rest.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || rest.get(digits) != Some(&b',') {
        return None;
    }

    let version = std::str::from_utf8(&rest[..digits])
        .ok()?
        .parse::<i64>()
        .ok()?;
    Some(if negative { -version } else { version })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.as_i64().is_some_and(|v| v < 0) => "negative integer",
        Value::Number(n) if n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(line: &[u8]) -> String {
    let end = line.len().min(PREVIEW_BYTES);
    String::from_utf8_lossy(&line[..end]).into_owned()
}
