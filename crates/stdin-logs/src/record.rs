// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log records and the batches they are delivered in.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One structured log entry decoded from a single line.
///
/// Fields are private so a record can only come out of [`LogRecord::new`] fully populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    timestamp: u64,
    severity_text: String,
    body: String,
}

impl LogRecord {
    pub fn new(timestamp: u64, severity_text: String, body: String) -> Self {
        Self {
            timestamp,
            severity_text,
            body,
        }
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn severity_text(&self) -> &str {
        &self.severity_text
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn severity(&self) -> Severity {
        Severity::from_text(&self.severity_text)
    }
}

/// OpenTelemetry severity numbers for the texts PostgreSQL emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Severity {
    Unspecified = 0,
    Trace = 1,
    Debug = 5,
    Info = 9,
    Info2 = 10,
    Warn = 13,
    Error = 17,
    Fatal = 21,
    Fatal2 = 22,
}

impl Severity {
    /// Maps a severity text onto the OpenTelemetry scale. Matching ignores ASCII case.
    pub fn from_text(text: &str) -> Self {
        match text.to_ascii_uppercase().as_str() {
            "TRACE" => Severity::Trace,
            "DEBUG" => Severity::Debug,
            "LOG" | "INFO" => Severity::Info,
            "NOTICE" => Severity::Info2,
            "WARNING" | "WARN" => Severity::Warn,
            "ERROR" => Severity::Error,
            "FATAL" => Severity::Fatal,
            "PANIC" => Severity::Fatal2,
            _ => Severity::Unspecified,
        }
    }

    pub fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Attributes describing the entity that produced the logs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Parses `key:value` pairs separated by commas or whitespace. Malformed pairs are
    /// ignored.
    pub fn from_env_string(env_attributes: &str) -> Self {
        let normalized = env_attributes.replace(',', " ");
        let attributes = normalized
            .split_whitespace()
            .filter_map(|kv| {
                let (key, value) = kv.split_once(':')?;
                if key.is_empty() || value.is_empty() || value.contains(':') {
                    return None;
                }
                Some((key.to_string(), value.to_string()))
            })
            .collect();
        Self { attributes }
    }
}

/// Instrumentation scope every batch is attributed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub name: String,
    pub version: String,
}

impl Scope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Ordered, non-empty group of records sharing one resource and scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Batch {
    resource: Resource,
    scope: Scope,
    records: Vec<LogRecord>,
}

impl Batch {
    /// Returns `None` when `records` is empty; an empty batch is never delivered.
    pub fn new(resource: Resource, scope: Scope, records: Vec<LogRecord>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        Some(Self {
            resource,
            scope,
            records,
        })
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    // Kept for API symmetry with len(); always false by construction.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_rejects_empty_records() {
        assert!(Batch::new(Resource::default(), Scope::new("test"), vec![]).is_none());
    }

    #[test]
    fn test_batch_preserves_order() {
        let records = vec![
            LogRecord::new(1, "INFO".into(), "first".into()),
            LogRecord::new(2, "INFO".into(), "second".into()),
        ];
        let batch = Batch::new(Resource::default(), Scope::new("test"), records.clone())
            .expect("batch should be created");
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
        assert_eq!(batch.records(), records.as_slice());
        assert_eq!(batch.scope().version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_severity_from_text() {
        assert_eq!(Severity::from_text("DEBUG").number(), 5);
        assert_eq!(Severity::from_text("LOG").number(), 9);
        assert_eq!(Severity::from_text("info").number(), 9);
        assert_eq!(Severity::from_text("NOTICE").number(), 10);
        assert_eq!(Severity::from_text("WARNING").number(), 13);
        assert_eq!(Severity::from_text("ERROR").number(), 17);
        assert_eq!(Severity::from_text("FATAL").number(), 21);
        assert_eq!(Severity::from_text("PANIC").number(), 22);
        assert_eq!(Severity::from_text("whatever"), Severity::Unspecified);
    }

    #[test]
    fn test_resource_from_env_string() {
        let resource = Resource::from_env_string("service.name:db, host:pg1 broken ::x a:b:c");
        assert_eq!(resource.attributes.len(), 2);
        assert_eq!(resource.attributes["service.name"], "db");
        assert_eq!(resource.attributes["host"], "pg1");
    }

    #[test]
    fn test_record_serializes_fields() {
        let record = LogRecord::new(12345, "INFO".into(), "some message".into());
        let json = serde_json::to_value(&record).expect("record serializes");
        assert_eq!(
            json,
            serde_json::json!({
                "timestamp": 12345,
                "severity_text": "INFO",
                "body": "some message"
            })
        );
    }
}
