use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::{
    descriptor::{AnyRecord, FieldDescriptor, Mappable, TypeKey},
    descriptor_cache::DescriptorCache,
    diagnostics::{DiagnosticKind, DiagnosticsSink, MappingDiagnostic, MappingReport, TracingSink},
    error::{ConfigError, ConversionError},
    field_type::FieldType,
    profile::MappingProfile,
    registry::MapperConfiguration,
    type_mapping::{MappingOptions, TypeMapping, TypePairKey},
    value::Value,
};

/// Maps records between registered (or convention-matched) type pairs.
///
/// Built from a [`MapperConfiguration`], which it consumes: the registry is
/// read-only for the lifetime of the mapper. Field failures never abort a
/// mapping call; they are sent to the diagnostics sink instead.
pub struct Mapper {
    type_mappings: HashMap<TypePairKey, TypeMapping>,
    descriptors: Arc<DescriptorCache>,
    sink: Arc<dyn DiagnosticsSink>,
    default_options: MappingOptions,
}

impl Mapper {
    pub fn new(config: MapperConfiguration) -> Self {
        let (type_mappings, descriptors) = config.into_parts();
        tracing::debug!(mappings = type_mappings.len(), "mapper configured");
        Self {
            type_mappings,
            descriptors,
            sink: Arc::new(TracingSink),
            default_options: MappingOptions::default(),
        }
    }

    /// Replace the diagnostics sink (defaults to [`TracingSink`]).
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Build a mapper from a single configuration callback.
    pub fn from_callback<F>(configure: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut MapperConfiguration) -> Result<(), ConfigError>,
    {
        let mut config = MapperConfiguration::new();
        configure(&mut config)?;
        Ok(Self::new(config))
    }

    /// Build a mapper from profiles, configured in the given order.
    pub fn from_profiles(profiles: &[&dyn MappingProfile]) -> Result<Self, ConfigError> {
        let mut config = MapperConfiguration::new();
        for profile in profiles {
            config.add_profile(*profile)?;
        }
        Ok(Self::new(config))
    }

    /// Map `source` into a new `D`.
    pub fn map<S: Mappable, D: Mappable>(&self, source: &S) -> D {
        let mut destination = D::default();
        self.map_into(source, &mut destination);
        destination
    }

    /// Map a record whose concrete type is only known at runtime.
    pub fn map_dyn<D: Mappable>(&self, source: &dyn AnyRecord) -> D {
        let mut destination = D::default();
        let diagnostics = self.run(
            source.as_any(),
            source.type_key(),
            &mut destination,
            TypeKey::of::<D>(),
        );
        self.flush(&diagnostics);
        destination
    }

    /// Merge `source` into an existing destination.
    pub fn map_into<S: Mappable, D: Mappable>(&self, source: &S, destination: &mut D) {
        let diagnostics = self.run(source, TypeKey::of::<S>(), destination, TypeKey::of::<D>());
        self.flush(&diagnostics);
    }

    pub fn map_list<'s, S, D, I>(&self, sources: I) -> Vec<D>
    where
        S: Mappable,
        D: Mappable,
        I: IntoIterator<Item = &'s S>,
    {
        sources.into_iter().map(|source| self.map(source)).collect()
    }

    /// Map `source` and also return every field failure of this call.
    pub fn map_with_report<S: Mappable, D: Mappable>(&self, source: &S) -> (D, MappingReport) {
        let mut destination = D::default();
        let diagnostics = self.run(source, TypeKey::of::<S>(), &mut destination, TypeKey::of::<D>());
        self.flush(&diagnostics);
        let report = MappingReport::new(S::type_name(), D::type_name(), diagnostics);
        (destination, report)
    }

    /// Convert a single value against a declared field type.
    ///
    /// Failures inside nested records go to the sink; the top-level failure
    /// is returned.
    pub fn convert(
        &self,
        value: Value,
        target: &FieldType,
        options: &MappingOptions,
    ) -> Result<Value, ConversionError> {
        let mut diagnostics = Vec::new();
        let converted = self.convert_value(value, target, options, &mut diagnostics);
        self.flush(&diagnostics);
        converted
    }

    pub fn descriptors(&self) -> &DescriptorCache {
        &self.descriptors
    }

    pub fn get_mapping(&self, key: &TypePairKey) -> Option<&TypeMapping> {
        self.type_mappings.get(key)
    }

    pub fn type_mapping<S: Mappable, D: Mappable>(&self) -> Option<&TypeMapping> {
        self.get_mapping(&TypePairKey::new(TypeKey::of::<S>(), TypeKey::of::<D>()))
    }

    pub fn registered_pairs(&self) -> Vec<TypePairKey> {
        let mut pairs: Vec<_> = self.type_mappings.keys().copied().collect();
        pairs.sort_by_key(|key| key.to_string());
        pairs
    }

    fn run(
        &self,
        source: &dyn Any,
        source_key: TypeKey,
        destination: &mut dyn Any,
        destination_key: TypeKey,
    ) -> Vec<MappingDiagnostic> {
        let mut diagnostics = Vec::new();
        self.map_object(source, source_key, destination, destination_key, &mut diagnostics);
        diagnostics
    }

    fn flush(&self, diagnostics: &[MappingDiagnostic]) {
        for diagnostic in diagnostics {
            self.sink.record(diagnostic);
        }
    }

    /// Resolve every destination field of one object.
    pub(crate) fn map_object(
        &self,
        source: &dyn Any,
        source_key: TypeKey,
        destination: &mut dyn Any,
        destination_key: TypeKey,
        diagnostics: &mut Vec<MappingDiagnostic>,
    ) {
        let pair = TypePairKey::new(source_key, destination_key);
        let mapping = self.type_mappings.get(&pair);
        let options = mapping.map_or(&self.default_options, TypeMapping::options);
        let source_fields = self.descriptors.get(source_key);
        let destination_fields = self.descriptors.get(destination_key);

        tracing::trace!(pair = %pair, registered = mapping.is_some(), "mapping object");

        let index = destination_index(destination_fields.fields(), options);
        let lookup = |name: &str| index.get(&index_key(name, options)).copied();
        let failure = |kind: DiagnosticKind, error: &ConversionError| {
            MappingDiagnostic::new(source_key.name(), destination_key.name(), kind, error)
        };
        let mut invoked: HashSet<&str> = HashSet::new();

        for field in source_fields.fields() {
            if !field.can_read() || field.is_ignored() {
                continue;
            }

            let raw = match field.read(source) {
                Ok(raw) => raw,
                Err(err) => {
                    diagnostics.push(
                        failure(DiagnosticKind::FieldMapping, &err).with_source_field(field.name()),
                    );
                    continue;
                }
            };
            if raw.is_null() && !options.map_null_values {
                continue;
            }

            let name = destination_name(field, mapping, options);
            let field_override = mapping.and_then(|m| m.override_for(name));
            if field_override.is_some_and(|o| o.is_ignored()) {
                continue;
            }
            let Some(target) = lookup(name) else {
                continue;
            };

            let resolver = field_override.and_then(|o| o.resolver().map(|r| (o.destination(), r)));
            let value = match resolver {
                Some((key, resolver)) => {
                    invoked.insert(key);
                    match resolver(source) {
                        Ok(value) => value,
                        Err(err) => {
                            diagnostics.push(
                                failure(DiagnosticKind::ValueResolver, &err)
                                    .with_source_field(field.name())
                                    .with_destination_field(target.name()),
                            );
                            continue;
                        }
                    }
                }
                None => match self.convert_value(raw, target.field_type(), options, diagnostics) {
                    Ok(value) => value,
                    Err(err) => {
                        diagnostics.push(
                            failure(DiagnosticKind::FieldMapping, &err)
                                .with_source_field(field.name())
                                .with_destination_field(target.name()),
                        );
                        continue;
                    }
                },
            };

            if let Err(err) = target.write(destination, value) {
                diagnostics.push(
                    failure(DiagnosticKind::FieldMapping, &err)
                        .with_source_field(field.name())
                        .with_destination_field(target.name()),
                );
            }
        }

        let Some(mapping) = mapping else {
            return;
        };

        // destination fields fed only by a resolver
        for field_override in mapping.overrides() {
            let Some(resolver) = field_override.resolver() else {
                continue;
            };
            if invoked.contains(field_override.destination()) {
                continue;
            }
            let Some(target) = lookup(field_override.destination()) else {
                continue;
            };

            let written = resolver(source).and_then(|value| target.write(destination, value));
            if let Err(err) = written {
                diagnostics.push(
                    failure(DiagnosticKind::ValueResolver, &err)
                        .with_destination_field(target.name()),
                );
            }
        }
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("type_mappings", &self.registered_pairs())
            .field("cached_descriptors", &self.descriptors.len())
            .finish()
    }
}

fn index_key(name: &str, options: &MappingOptions) -> String {
    if options.ignore_case {
        name.to_lowercase()
    } else {
        name.to_string()
    }
}

/// Writable, non-ignored destination fields by name. On a case-folded
/// collision the first declared field wins.
fn destination_index<'d>(
    fields: &'d [FieldDescriptor],
    options: &MappingOptions,
) -> HashMap<String, &'d FieldDescriptor> {
    let mut index = HashMap::new();
    for field in fields {
        if field.can_write() && !field.is_ignored() {
            index.entry(index_key(field.name(), options)).or_insert(field);
        }
    }
    index
}

/// Destination name for a source field. Later rules win: the field's own
/// name, an override naming it as source, its `map_to` marker, then
/// `custom_mappings`.
fn destination_name<'a>(
    field: &'a FieldDescriptor,
    mapping: Option<&'a TypeMapping>,
    options: &'a MappingOptions,
) -> &'a str {
    let mut name = field.name();
    if let Some(field_override) = mapping.and_then(|m| m.override_by_source(field.name())) {
        name = field_override.destination();
    }
    if let Some(renamed) = field.map_to() {
        name = renamed;
    }
    if let Some(custom) = options.custom_mappings.get(field.name()) {
        name = custom.as_str();
    }
    name
}

/// `source.map_to::<Dest>(&mapper)`
pub trait MapExt: Mappable {
    fn map_to<D: Mappable>(&self, mapper: &Mapper) -> D {
        mapper.map(self)
    }
}

impl<T: Mappable> MapExt for T {}

/// `sources.map_to_list::<Dest>(&mapper)`
pub trait MapListExt {
    fn map_to_list<D: Mappable>(&self, mapper: &Mapper) -> Vec<D>;
}

impl<S: Mappable> MapListExt for [S] {
    fn map_to_list<D: Mappable>(&self, mapper: &Mapper) -> Vec<D> {
        mapper.map_list(self)
    }
}
