//! Mapping profiles: reusable units of configuration.
//!
//! A profile is anything that can configure a [`MapperConfiguration`]. Plain
//! closures are profiles, and so are declarative YAML documents:
//!
//! ```yaml
//! name: users
//! mappings:
//!   - source: UserDto
//!     destination: UserEntity
//!     options:
//!       deep_copy: false
//!     fields:
//!       - destination: full_name
//!         from: name
//!       - destination: password
//!         ignore: true
//! ```
//!
//! Type names in a document must be registered with
//! [`MapperConfiguration::register_type`] before the document is applied.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    error::ConfigError,
    registry::{is_field_name, MapperConfiguration},
    type_mapping::MappingOptions,
};

/// A unit of mapping configuration.
pub trait MappingProfile {
    fn configure(&self, config: &mut MapperConfiguration) -> Result<(), ConfigError>;
}

impl<F> MappingProfile for F
where
    F: Fn(&mut MapperConfiguration) -> Result<(), ConfigError>,
{
    fn configure(&self, config: &mut MapperConfiguration) -> Result<(), ConfigError> {
        self(config)
    }
}

static PROFILE_SCHEMA: LazyLock<serde_json::Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "required": ["mappings"],
        "additionalProperties": false,
        "properties": {
            "name": { "type": "string" },
            "mappings": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["source", "destination"],
                    "additionalProperties": false,
                    "properties": {
                        "source": { "type": "string", "minLength": 1 },
                        "destination": { "type": "string", "minLength": 1 },
                        "options": {
                            "type": "object",
                            "additionalProperties": false,
                            "properties": {
                                "ignore_case": { "type": "boolean" },
                                "map_null_values": { "type": "boolean" },
                                "deep_copy": { "type": "boolean" },
                                "custom_mappings": {
                                    "type": "object",
                                    "additionalProperties": { "type": "string" }
                                }
                            }
                        },
                        "fields": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "required": ["destination"],
                                "additionalProperties": false,
                                "properties": {
                                    "destination": { "type": "string" },
                                    "from": { "type": "string" },
                                    "ignore": { "type": "boolean" }
                                }
                            }
                        }
                    }
                }
            }
        }
    })
});

/// Declarative profile loaded from YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileDocument {
    #[serde(default)]
    pub name: Option<String>,
    pub mappings: Vec<MappingDeclaration>,
}

/// One `source -> destination` pair of a [`ProfileDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingDeclaration {
    pub source: String,
    pub destination: String,
    #[serde(default)]
    pub options: MappingOptions,
    #[serde(default)]
    pub fields: Vec<FieldDeclaration>,
}

/// Rule for one destination field: copy `from` a source field, or `ignore` it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDeclaration {
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default)]
    pub ignore: bool,
}

impl ProfileDocument {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let instance: serde_json::Value = serde_yaml::from_str(text)?;

        let schema = jsonschema::JSONSchema::compile(&PROFILE_SCHEMA)
            .map_err(|e| ConfigError::InvalidProfile(format!("schema does not compile: {}", e)))?;
        if let Err(errors) = schema.validate(&instance) {
            let messages: Vec<String> = errors
                .map(|error| format!("{}: {}", error.instance_path, error))
                .collect();
            return Err(ConfigError::InvalidProfile(messages.join("; ")));
        }

        let document: ProfileDocument = serde_json::from_value(instance)
            .map_err(|e| ConfigError::InvalidProfile(e.to_string()))?;
        document.validate()?;
        Ok(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Checks the schema cannot express: field names and `from` / `ignore`
    /// exclusivity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |message: String| Err(ConfigError::InvalidProfile(message));

        for mapping in &self.mappings {
            let pair = format!("{} -> {}", mapping.source, mapping.destination);

            for (source, destination) in &mapping.options.custom_mappings {
                if !is_field_name(source) || !is_field_name(destination) {
                    return invalid(format!(
                        "{}: custom mapping '{}' -> '{}' is not a pair of field names",
                        pair, source, destination
                    ));
                }
            }

            for field in &mapping.fields {
                if !is_field_name(&field.destination) {
                    return invalid(format!(
                        "{}: '{}' is not a field name",
                        pair, field.destination
                    ));
                }
                match (&field.from, field.ignore) {
                    (Some(from), false) if is_field_name(from) => {}
                    (Some(from), false) => {
                        return invalid(format!("{}: '{}' is not a field name", pair, from));
                    }
                    (None, true) => {}
                    _ => {
                        return invalid(format!(
                            "{}: field '{}' must declare exactly one of 'from' or 'ignore: true'",
                            pair, field.destination
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

impl MappingProfile for ProfileDocument {
    fn configure(&self, config: &mut MapperConfiguration) -> Result<(), ConfigError> {
        self.validate()?;

        for declaration in &self.mappings {
            let source = config
                .type_by_name(&declaration.source)
                .ok_or_else(|| ConfigError::UnknownType(declaration.source.clone()))?;
            let destination = config
                .type_by_name(&declaration.destination)
                .ok_or_else(|| ConfigError::UnknownType(declaration.destination.clone()))?;

            let mut builder = config.create_map_for(source, destination);
            builder.with_options(|options| *options = declaration.options.clone());
            for field in &declaration.fields {
                match &field.from {
                    Some(from) => builder.map_field(&field.destination, from)?,
                    None => builder.ignore_field(&field.destination)?,
                };
            }
        }

        tracing::info!(
            profile = self.name.as_deref().unwrap_or("<unnamed>"),
            mappings = self.mappings.len(),
            "applied mapping profile"
        );
        Ok(())
    }
}
