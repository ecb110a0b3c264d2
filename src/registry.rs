use std::any::Any;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt::Display;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::{
    descriptor::{Mappable, TypeDescriptor, TypeKey},
    descriptor_cache::DescriptorCache,
    error::{ConfigError, ConversionError},
    field_type::MapValue,
    mapper::Mapper,
    profile::MappingProfile,
    type_mapping::{FieldOverride, MappingOptions, TypeMapping, TypePairKey, ValueResolver},
};

static FIELD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("field name pattern is valid")
});

pub(crate) fn is_field_name(selector: &str) -> bool {
    FIELD_NAME.is_match(selector)
}

fn check_selector(selector: &str) -> Result<(), ConfigError> {
    if is_field_name(selector) {
        Ok(())
    } else {
        Err(ConfigError::MalformedSelector {
            selector: selector.to_string(),
        })
    }
}

/// Startup registry of type mappings.
///
/// Populate it once, then turn it into a [`Mapper`]; the mapper owns the
/// registry from then on, so no further registration is possible.
pub struct MapperConfiguration {
    type_mappings: HashMap<TypePairKey, TypeMapping>,
    descriptors: Arc<DescriptorCache>,
    type_names: HashMap<String, TypeKey>,
}

impl MapperConfiguration {
    pub fn new() -> Self {
        Self {
            type_mappings: HashMap::new(),
            descriptors: Arc::new(DescriptorCache::new()),
            type_names: HashMap::new(),
        }
    }

    /// Register (or re-register) the mapping `S -> D`.
    ///
    /// An existing mapping for the same pair is replaced, not merged.
    pub fn create_map<S: Mappable, D: Mappable>(&mut self) -> TypeMapExpression<'_, S, D> {
        TypeMapExpression {
            inner: self.create_map_for(TypeKey::of::<S>(), TypeKey::of::<D>()),
            _types: PhantomData,
        }
    }

    pub(crate) fn create_map_for(&mut self, source: TypeKey, destination: TypeKey) -> MappingBuilder<'_> {
        let key = TypePairKey::new(source, destination);
        let source = self.descriptors.get(source);
        let destination = self.descriptors.get(destination);

        let mapping = match self.type_mappings.entry(key) {
            Entry::Occupied(mut entry) => {
                tracing::debug!(pair = %key, "replacing existing type mapping");
                entry.insert(TypeMapping::new(key));
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                tracing::debug!(pair = %key, "registered type mapping");
                entry.insert(TypeMapping::new(key))
            }
        };

        MappingBuilder {
            mapping,
            source,
            destination,
        }
    }

    /// Make `T` addressable by name from declarative profiles.
    pub fn register_type<T: Mappable>(&mut self) -> &mut Self {
        self.register_type_as::<T>(T::type_name())
    }

    pub fn register_type_as<T: Mappable>(&mut self, name: &str) -> &mut Self {
        self.type_names.insert(name.to_string(), TypeKey::of::<T>());
        self
    }

    pub fn type_by_name(&self, name: &str) -> Option<TypeKey> {
        self.type_names.get(name).copied()
    }

    /// Run a profile's configuration against this registry.
    pub fn add_profile(&mut self, profile: &dyn MappingProfile) -> Result<&mut Self, ConfigError> {
        profile.configure(self)?;
        Ok(self)
    }

    pub fn get_mapping(&self, key: &TypePairKey) -> Option<&TypeMapping> {
        self.type_mappings.get(key)
    }

    pub fn mapping_count(&self) -> usize {
        self.type_mappings.len()
    }

    /// Registered pairs, sorted by their display form.
    pub fn registered_pairs(&self) -> Vec<TypePairKey> {
        let mut pairs: Vec<_> = self.type_mappings.keys().copied().collect();
        pairs.sort_by_key(|key| key.to_string());
        pairs
    }

    pub fn build(self) -> Mapper {
        Mapper::new(self)
    }

    pub(crate) fn into_parts(self) -> (HashMap<TypePairKey, TypeMapping>, Arc<DescriptorCache>) {
        (self.type_mappings, self.descriptors)
    }
}

impl Default for MapperConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// Untyped builder over one registered [`TypeMapping`].
///
/// Field names are validated against the two type descriptors as they are
/// configured.
pub struct MappingBuilder<'a> {
    mapping: &'a mut TypeMapping,
    source: Arc<TypeDescriptor>,
    destination: Arc<TypeDescriptor>,
}

impl<'a> MappingBuilder<'a> {
    fn check_destination(&self, field: &str) -> Result<(), ConfigError> {
        check_selector(field)?;
        let descriptor = self.destination.field(field).ok_or_else(|| ConfigError::UnknownField {
            type_name: self.destination.name().to_string(),
            field: field.to_string(),
        })?;
        if !descriptor.can_write() {
            return Err(ConfigError::FieldNotWritable {
                type_name: self.destination.name().to_string(),
                field: field.to_string(),
            });
        }
        Ok(())
    }

    fn check_source(&self, field: &str) -> Result<(), ConfigError> {
        check_selector(field)?;
        let descriptor = self.source.field(field).ok_or_else(|| ConfigError::UnknownField {
            type_name: self.source.name().to_string(),
            field: field.to_string(),
        })?;
        if !descriptor.can_read() {
            return Err(ConfigError::FieldNotReadable {
                type_name: self.source.name().to_string(),
                field: field.to_string(),
            });
        }
        Ok(())
    }

    pub fn map_field(&mut self, destination: &str, source: &str) -> Result<&mut Self, ConfigError> {
        self.check_destination(destination)?;
        self.check_source(source)?;
        self.mapping
            .set_override(FieldOverride::from_source(destination, source));
        Ok(self)
    }

    pub fn ignore_field(&mut self, destination: &str) -> Result<&mut Self, ConfigError> {
        self.check_destination(destination)?;
        self.mapping.set_override(FieldOverride::ignored(destination));
        Ok(self)
    }

    pub fn with_options<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut MappingOptions),
    {
        configure(self.mapping.options_mut());
        self
    }

    pub fn options(&self) -> &MappingOptions {
        self.mapping.options()
    }
}

/// Typed builder returned by [`MapperConfiguration::create_map`].
pub struct TypeMapExpression<'a, S, D> {
    inner: MappingBuilder<'a>,
    _types: PhantomData<fn(&S) -> D>,
}

impl<'a, S: Mappable, D: Mappable> TypeMapExpression<'a, S, D> {
    /// Start configuring destination field `destination`.
    pub fn for_field(&mut self, destination: &str) -> Result<MemberExpression<'_, 'a, S, D>, ConfigError> {
        self.inner.check_destination(destination)?;
        Ok(MemberExpression {
            parent: self,
            destination: destination.to_string(),
        })
    }

    /// Adjust the options shared by every field of this mapping.
    pub fn with_options<F>(&mut self, configure: F) -> &mut Self
    where
        F: FnOnce(&mut MappingOptions),
    {
        self.inner.with_options(configure);
        self
    }

    pub fn options(&self) -> &MappingOptions {
        self.inner.options()
    }
}

/// Rule for one destination field, finished by `map_from*` or `ignore`.
pub struct MemberExpression<'e, 'a, S, D> {
    parent: &'e mut TypeMapExpression<'a, S, D>,
    destination: String,
}

impl<'e, 'a, S: Mappable, D: Mappable> MemberExpression<'e, 'a, S, D> {
    /// Copy from the named source field.
    pub fn map_from(self, source: &str) -> Result<&'e mut TypeMapExpression<'a, S, D>, ConfigError> {
        let parent = self.parent;
        parent.inner.map_field(&self.destination, source)?;
        Ok(parent)
    }

    /// Compute the value from the whole source object.
    pub fn map_from_fn<F, R>(self, resolver: R) -> &'e mut TypeMapExpression<'a, S, D>
    where
        F: MapValue,
        R: Fn(&S) -> F + Send + Sync + 'static,
    {
        self.install(Arc::new(move |source: &dyn Any| {
            let source = downcast_source::<S>(source)?;
            Ok(resolver(source).to_value())
        }))
    }

    /// Like [`map_from_fn`](Self::map_from_fn) for resolvers that can fail.
    pub fn try_map_from_fn<F, E, R>(self, resolver: R) -> &'e mut TypeMapExpression<'a, S, D>
    where
        F: MapValue,
        E: Display,
        R: Fn(&S) -> Result<F, E> + Send + Sync + 'static,
    {
        self.install(Arc::new(move |source: &dyn Any| {
            let source = downcast_source::<S>(source)?;
            resolver(source)
                .map(|value| value.to_value())
                .map_err(|e| ConversionError::Resolver(e.to_string()))
        }))
    }

    /// Never write this destination field.
    pub fn ignore(self) -> &'e mut TypeMapExpression<'a, S, D> {
        let parent = self.parent;
        parent
            .inner
            .mapping
            .set_override(FieldOverride::ignored(&self.destination));
        parent
    }

    fn install(self, resolver: ValueResolver) -> &'e mut TypeMapExpression<'a, S, D> {
        let parent = self.parent;
        parent
            .inner
            .mapping
            .set_override(FieldOverride::from_resolver(&self.destination, resolver));
        parent
    }
}

fn downcast_source<S: Mappable>(source: &dyn Any) -> Result<&S, ConversionError> {
    source
        .downcast_ref::<S>()
        .ok_or_else(|| ConversionError::ReceiverMismatch {
            expected: S::type_name().to_string(),
        })
}
