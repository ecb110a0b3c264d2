use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{descriptor::TypeKey, error::ConversionError, value::Value};

/// Produces a destination value from the whole source object.
pub type ValueResolver = Arc<dyn Fn(&dyn Any) -> Result<Value, ConversionError> + Send + Sync>;

/// Directional key of a type mapping: `Source -> Destination`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypePairKey {
    pub source: TypeKey,
    pub destination: TypeKey,
}

impl TypePairKey {
    pub fn new(source: TypeKey, destination: TypeKey) -> Self {
        Self {
            source,
            destination,
        }
    }
}

impl fmt::Display for TypePairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.destination)
    }
}

/// Options shared by every field of one type mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingOptions {
    /// Match field names case-insensitively, using Unicode lowercase folding.
    pub ignore_case: bool,
    /// Write null source values (as the destination's zero value).
    pub map_null_values: bool,
    /// Re-map nested records into fresh instances instead of sharing them.
    pub deep_copy: bool,
    /// Source field name -> destination field name; highest naming precedence.
    pub custom_mappings: HashMap<String, String>,
}

impl Default for MappingOptions {
    fn default() -> Self {
        Self {
            ignore_case: true,
            map_null_values: true,
            deep_copy: true,
            custom_mappings: HashMap::new(),
        }
    }
}

impl MappingOptions {
    pub fn names_match(&self, a: &str, b: &str) -> bool {
        if self.ignore_case {
            a == b || a.to_lowercase() == b.to_lowercase()
        } else {
            a == b
        }
    }
}

/// Rule for a single destination field.
#[derive(Clone)]
pub struct FieldOverride {
    destination: String,
    source: Option<String>,
    resolver: Option<ValueResolver>,
    ignore: bool,
}

impl FieldOverride {
    pub fn from_source(destination: &str, source: &str) -> Self {
        Self {
            destination: destination.to_string(),
            source: Some(source.to_string()),
            resolver: None,
            ignore: false,
        }
    }

    pub fn from_resolver(destination: &str, resolver: ValueResolver) -> Self {
        Self {
            destination: destination.to_string(),
            source: None,
            resolver: Some(resolver),
            ignore: false,
        }
    }

    pub fn ignored(destination: &str) -> Self {
        Self {
            destination: destination.to_string(),
            source: None,
            resolver: None,
            ignore: true,
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn resolver(&self) -> Option<&ValueResolver> {
        self.resolver.as_ref()
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }
}

impl fmt::Debug for FieldOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldOverride")
            .field("destination", &self.destination)
            .field("source", &self.source)
            .field("resolver", &self.resolver.is_some())
            .field("ignore", &self.ignore)
            .finish()
    }
}

/// Registered configuration of one type pair.
#[derive(Debug, Clone)]
pub struct TypeMapping {
    key: TypePairKey,
    overrides: Vec<FieldOverride>,
    options: MappingOptions,
}

impl TypeMapping {
    pub fn new(key: TypePairKey) -> Self {
        Self {
            key,
            overrides: Vec::new(),
            options: MappingOptions::default(),
        }
    }

    pub fn key(&self) -> TypePairKey {
        self.key
    }

    pub fn options(&self) -> &MappingOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut MappingOptions {
        &mut self.options
    }

    /// Overrides in the order their destination fields were first configured.
    pub fn overrides(&self) -> &[FieldOverride] {
        &self.overrides
    }

    /// Insert or replace the override for its destination field.
    pub fn set_override(&mut self, field_override: FieldOverride) {
        match self
            .overrides
            .iter_mut()
            .find(|o| o.destination == field_override.destination)
        {
            Some(existing) => *existing = field_override,
            None => self.overrides.push(field_override),
        }
    }

    pub fn override_for(&self, destination: &str) -> Option<&FieldOverride> {
        self.overrides
            .iter()
            .find(|o| self.options.names_match(&o.destination, destination))
    }

    /// First override that names `source` as its explicit source field.
    pub fn override_by_source(&self, source: &str) -> Option<&FieldOverride> {
        self.overrides
            .iter()
            .find(|o| o.source.as_deref() == Some(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{UserDto, UserEntity};

    fn user_key() -> TypePairKey {
        TypePairKey::new(TypeKey::of::<UserDto>(), TypeKey::of::<UserEntity>())
    }

    #[test]
    fn test_pair_key_is_directional() {
        let forward = user_key();
        let backward = TypePairKey::new(TypeKey::of::<UserEntity>(), TypeKey::of::<UserDto>());

        assert_ne!(forward, backward);
        assert_eq!(forward.to_string(), "UserDto -> UserEntity");
    }

    #[test]
    fn test_default_options() {
        let options = MappingOptions::default();
        assert!(options.ignore_case);
        assert!(options.map_null_values);
        assert!(options.deep_copy);
        assert!(options.custom_mappings.is_empty());
    }

    #[test]
    fn test_partial_options_deserialize_with_defaults() {
        let options: MappingOptions = serde_yaml::from_str(
            r#"
            deep_copy: false
            custom_mappings:
              nick: alias
            "#,
        )
        .unwrap();

        assert!(!options.deep_copy);
        assert!(options.ignore_case);
        assert_eq!(options.custom_mappings["nick"], "alias");
    }

    #[test]
    fn test_set_override_replaces_same_destination() {
        let mut mapping = TypeMapping::new(user_key());
        mapping.set_override(FieldOverride::from_source("full_name", "name"));
        mapping.set_override(FieldOverride::ignored("age"));
        mapping.set_override(FieldOverride::ignored("full_name"));

        assert_eq!(mapping.overrides().len(), 2);
        assert_eq!(mapping.overrides()[0].destination(), "full_name");
        assert!(mapping.override_for("full_name").unwrap().is_ignored());
        assert!(mapping.override_by_source("name").is_none());
    }

    #[test]
    fn test_names_match_folds_non_ascii() {
        let options = MappingOptions::default();
        assert!(options.names_match("Größe", "GRÖßE"));
        assert!(options.names_match("Ärger", "ärger"));
        assert!(!options.names_match("Größe", "Grosse"));

        let strict = MappingOptions {
            ignore_case: false,
            ..MappingOptions::default()
        };
        assert!(!strict.names_match("Ärger", "ärger"));
    }

    #[test]
    fn test_override_lookup_follows_case_rule() {
        let mut mapping = TypeMapping::new(user_key());
        mapping.set_override(FieldOverride::from_source("full_name", "name"));

        assert!(mapping.override_for("FULL_NAME").is_some());
        mapping.options_mut().ignore_case = false;
        assert!(mapping.override_for("FULL_NAME").is_none());
        assert_eq!(
            mapping.override_by_source("name").unwrap().destination(),
            "full_name"
        );
    }
}
