use std::fmt::Write as _;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Where a field failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// Reading, converting or writing a source-driven field.
    FieldMapping,
    /// Running a value resolver for a destination field.
    ValueResolver,
}

/// A single field that failed to map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDiagnostic {
    pub source_type: String,
    pub destination_type: String,
    /// Source field name, absent for resolver-only destination fields.
    pub source_field: Option<String>,
    pub destination_field: Option<String>,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl MappingDiagnostic {
    pub fn new(
        source_type: &str,
        destination_type: &str,
        kind: DiagnosticKind,
        error: &ConversionError,
    ) -> Self {
        Self {
            source_type: source_type.to_string(),
            destination_type: destination_type.to_string(),
            source_field: None,
            destination_field: None,
            kind,
            message: error.to_string(),
        }
    }

    pub fn with_source_field(mut self, field: &str) -> Self {
        self.source_field = Some(field.to_string());
        self
    }

    pub fn with_destination_field(mut self, field: &str) -> Self {
        self.destination_field = Some(field.to_string());
        self
    }

    /// The field name shown to users: the source field if known.
    pub fn field(&self) -> &str {
        self.source_field
            .as_deref()
            .or(self.destination_field.as_deref())
            .unwrap_or("<unknown>")
    }
}

/// Receives field failures as they are recorded.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, diagnostic: &MappingDiagnostic);
}

/// Default sink: emits a `tracing` warning per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, diagnostic: &MappingDiagnostic) {
        tracing::warn!(
            source_type = %diagnostic.source_type,
            destination_type = %diagnostic.destination_type,
            field = diagnostic.field(),
            "Error mapping field: {}",
            diagnostic.message
        );
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<MappingDiagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain the collected diagnostics.
    pub fn take(&self) -> Vec<MappingDiagnostic> {
        std::mem::take(&mut *self.entries.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingSink {
    fn record(&self, diagnostic: &MappingDiagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(diagnostic.clone());
    }
}

/// Outcome of one top-level mapping call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingReport {
    pub source_type: String,
    pub destination_type: String,
    pub diagnostics: Vec<MappingDiagnostic>,
}

impl MappingReport {
    pub fn new(source_type: &str, destination_type: &str, diagnostics: Vec<MappingDiagnostic>) -> Self {
        Self {
            source_type: source_type.to_string(),
            destination_type: destination_type.to_string(),
            diagnostics,
        }
    }

    /// True when every field mapped without error.
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn failed_fields(&self) -> Vec<&str> {
        self.diagnostics.iter().map(MappingDiagnostic::field).collect()
    }
}

/// Available output formats for mapping reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

/// Renders [`MappingReport`]s.
pub struct MappingReporter {
    output_format: ReportFormat,
}

impl MappingReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn format_report(&self, report: &MappingReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.format_console_report(report)),
            ReportFormat::Json => serde_json::to_string_pretty(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
            ReportFormat::Yaml => serde_yaml::to_string(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
        }
    }

    fn format_console_report(&self, report: &MappingReport) -> String {
        let mut output = String::new();
        let _ = writeln!(
            output,
            "=== Mapping Report: {} -> {} ===",
            report.source_type, report.destination_type
        );

        if report.is_clean() {
            output.push_str("  ✓ All fields mapped\n");
            return output;
        }

        let _ = writeln!(output, "  ⚠ {} field(s) failed:", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            let _ = writeln!(output, "    - {}: {}", diagnostic.field(), diagnostic.message);
        }
        output
    }
}

impl Default for MappingReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_diagnostic() -> MappingDiagnostic {
        MappingDiagnostic::new(
            "UserDto",
            "UserEntity",
            DiagnosticKind::FieldMapping,
            &ConversionError::parse("abc", "i32"),
        )
        .with_source_field("age")
        .with_destination_field("age")
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        assert!(sink.is_empty());

        sink.record(&sample_diagnostic());
        assert_eq!(sink.len(), 1);

        let taken = sink.take();
        assert_eq!(taken[0].message, "Cannot parse 'abc' as i32");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_diagnostic_field_prefers_source() {
        let resolver_only = MappingDiagnostic::new(
            "UserDto",
            "UserEntity",
            DiagnosticKind::ValueResolver,
            &ConversionError::Resolver("boom".to_string()),
        )
        .with_destination_field("summary");

        assert_eq!(sample_diagnostic().field(), "age");
        assert_eq!(resolver_only.field(), "summary");
    }

    #[test]
    fn test_reporter_with_format() {
        let reporter = MappingReporter::new().with_format(ReportFormat::Json);
        assert_eq!(reporter.output_format, ReportFormat::Json);
    }

    #[test]
    fn test_format_console_report() {
        let reporter = MappingReporter::new();
        let clean = MappingReport::new("Point", "Point2D", Vec::new());
        assert!(reporter.format_report(&clean).unwrap().contains("All fields mapped"));

        let failed = MappingReport::new("UserDto", "UserEntity", vec![sample_diagnostic()]);
        let formatted = reporter.format_report(&failed).unwrap();
        assert!(formatted.contains("UserDto -> UserEntity"));
        assert!(formatted.contains("age: Cannot parse 'abc' as i32"));
        assert_eq!(failed.failed_fields(), vec!["age"]);
    }

    #[test]
    fn test_format_json_report() {
        let reporter = MappingReporter::new().with_format(ReportFormat::Json);
        let report = MappingReport::new("UserDto", "UserEntity", vec![sample_diagnostic()]);
        let json: serde_json::Value =
            serde_json::from_str(&reporter.format_report(&report).unwrap()).unwrap();
        assert_eq!(json["diagnostics"][0]["kind"], "FieldMapping");
    }
}
