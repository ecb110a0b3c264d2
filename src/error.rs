use thiserror::Error;

/// Errors raised while building the mapping configuration.
///
/// These are programmer errors: callers are expected to abort startup on them.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Malformed field selector '{selector}': expected a plain field name")]
    MalformedSelector { selector: String },

    #[error("Type {type_name} has no field named '{field}'")]
    UnknownField { type_name: String, field: String },

    #[error("Field {type_name}.{field} is not readable")]
    FieldNotReadable { type_name: String, field: String },

    #[error("Field {type_name}.{field} is not writable")]
    FieldNotWritable { type_name: String, field: String },

    #[error("Unknown type '{0}' in profile; register it with register_type first")]
    UnknownType(String),

    #[error("Invalid profile document: {0}")]
    InvalidProfile(String),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Failed to read profile: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while converting or writing a single field value.
///
/// The resolution engine never propagates these; each one becomes a
/// [`MappingDiagnostic`](crate::diagnostics::MappingDiagnostic).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("Cannot convert {from} to {to}")]
    Unsupported { from: String, to: String },

    #[error("Value {value} is out of range for {to}")]
    OutOfRange { value: String, to: String },

    #[error("Cannot parse '{text}' as {to}")]
    Parse { text: String, to: String },

    #[error("'{member}' is not a member of enum {enum_name}")]
    UnknownEnumMember { enum_name: String, member: String },

    #[error("{value} is not a defined value of enum {enum_name}")]
    UndefinedEnumValue { enum_name: String, value: String },

    #[error("Expected a value of type {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("Object is not an instance of {expected}")]
    ReceiverMismatch { expected: String },

    #[error("Value resolver failed: {0}")]
    Resolver(String),
}

impl ConversionError {
    pub(crate) fn unsupported(from: &str, to: impl ToString) -> Self {
        ConversionError::Unsupported {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub(crate) fn out_of_range(value: impl ToString, to: impl ToString) -> Self {
        ConversionError::OutOfRange {
            value: value.to_string(),
            to: to.to_string(),
        }
    }

    pub(crate) fn parse(text: &str, to: impl ToString) -> Self {
        ConversionError::Parse {
            text: text.to_string(),
            to: to.to_string(),
        }
    }

    pub(crate) fn mismatch(expected: impl ToString, found: &crate::value::Value) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            found: found.kind_name().to_string(),
        }
    }
}
