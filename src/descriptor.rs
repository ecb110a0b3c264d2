//! Per-type accessor tables.
//!
//! A type takes part in mapping by implementing [`Mappable`]: its `describe`
//! function lists the fields with typed getter/setter closures. The closures
//! are erased into a [`TypeDescriptor`] so the engine can read and write
//! fields by name without knowing the concrete type.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    error::ConversionError,
    field_type::{FieldType, MapValue},
    value::Value,
};

/// A type whose fields can be mapped by name.
pub trait Mappable: Default + Send + Sync + 'static {
    /// Declare the fields of this type.
    fn describe(shape: &mut ShapeBuilder<Self>);

    /// Name used in diagnostics and declarative profiles.
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Object-safe view of a [`Mappable`] value.
pub trait AnyRecord: Any + Send + Sync {
    fn type_key(&self) -> TypeKey;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Mappable> AnyRecord for T {
    fn type_key(&self) -> TypeKey {
        TypeKey::of::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any_arc(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    let start = full[..head_end].rfind("::").map_or(0, |i| i + 2);
    &full[start..]
}

/// Identity of a mappable type.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    describe: fn() -> TypeDescriptor,
}

impl TypeKey {
    pub fn of<T: Mappable>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: T::type_name(),
            describe: describe::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn describe(&self) -> TypeDescriptor {
        (self.describe)()
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeKey({})", self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

type Getter = Arc<dyn Fn(&dyn Any) -> Option<Value> + Send + Sync>;
type Setter = Arc<dyn Fn(&mut dyn Any, Value) -> Result<(), ConversionError> + Send + Sync>;

/// Declarative markers attached to a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMarkers {
    /// Exclude the field from mapping on either side.
    pub ignore: bool,
    /// Destination field name used when this field is a source.
    pub map_to: Option<String>,
}

/// One field of a type: declared type, capabilities, markers and accessors.
#[derive(Clone)]
pub struct FieldDescriptor {
    name: &'static str,
    field_type: FieldType,
    markers: FieldMarkers,
    owner: &'static str,
    getter: Option<Getter>,
    setter: Option<Setter>,
}

impl FieldDescriptor {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn markers(&self) -> &FieldMarkers {
        &self.markers
    }

    pub fn can_read(&self) -> bool {
        self.getter.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.setter.is_some()
    }

    pub fn is_ignored(&self) -> bool {
        self.markers.ignore
    }

    pub fn map_to(&self) -> Option<&str> {
        self.markers.map_to.as_deref()
    }

    pub fn read(&self, target: &dyn Any) -> Result<Value, ConversionError> {
        let getter = self.getter.as_ref().ok_or_else(|| ConversionError::Unsupported {
            from: format!("{}.{}", self.owner, self.name),
            to: "a readable value".to_string(),
        })?;
        getter(target).ok_or_else(|| ConversionError::ReceiverMismatch {
            expected: self.owner.to_string(),
        })
    }

    pub fn write(&self, target: &mut dyn Any, value: Value) -> Result<(), ConversionError> {
        let setter = self.setter.as_ref().ok_or_else(|| ConversionError::Unsupported {
            from: value.kind_name().to_string(),
            to: format!("read-only field {}.{}", self.owner, self.name),
        })?;
        setter(target, value)
    }
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("readable", &self.can_read())
            .field("writable", &self.can_write())
            .field("markers", &self.markers)
            .finish()
    }
}

/// Field list and factory for one type.
#[derive(Clone)]
pub struct TypeDescriptor {
    key: TypeKey,
    fields: Vec<FieldDescriptor>,
    factory: fn() -> Box<dyn AnyRecord>,
}

impl TypeDescriptor {
    pub fn key(&self) -> TypeKey {
        self.key
    }

    pub fn name(&self) -> &'static str {
        self.key.name()
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// A default-constructed instance of the type.
    pub fn instantiate(&self) -> Box<dyn AnyRecord> {
        (self.factory)()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("key", &self.key)
            .field("fields", &self.fields)
            .finish()
    }
}

fn new_instance<T: Mappable>() -> Box<dyn AnyRecord> {
    Box::new(T::default())
}

/// Build the descriptor of `T` by running its `describe`.
pub fn describe<T: Mappable>() -> TypeDescriptor {
    let mut shape = ShapeBuilder::<T>::new();
    T::describe(&mut shape);
    TypeDescriptor {
        key: TypeKey::of::<T>(),
        fields: shape.fields,
        factory: new_instance::<T>,
    }
}

/// Collects the fields of `T` inside [`Mappable::describe`].
pub struct ShapeBuilder<T> {
    fields: Vec<FieldDescriptor>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Mappable> ShapeBuilder<T> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// A readable and writable field backed by a struct member.
    pub fn field<F, G, M>(&mut self, name: &'static str, get: G, get_mut: M) -> FieldSpec<'_>
    where
        F: MapValue + 'static,
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        let owner = T::type_name();
        let getter: Getter =
            Arc::new(move |target: &dyn Any| target.downcast_ref::<T>().map(|t| get(t).to_value()));
        let setter: Setter = Arc::new(move |target: &mut dyn Any, value: Value| {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| ConversionError::ReceiverMismatch {
                    expected: owner.to_string(),
                })?;
            *get_mut(target) = F::from_value(value)?;
            Ok(())
        });
        self.push(name, F::field_type(), Some(getter), Some(setter))
    }

    /// A computed field that can only be read.
    pub fn read_only<F, G>(&mut self, name: &'static str, get: G) -> FieldSpec<'_>
    where
        F: MapValue + 'static,
        G: Fn(&T) -> F + Send + Sync + 'static,
    {
        let getter: Getter =
            Arc::new(move |target: &dyn Any| target.downcast_ref::<T>().map(|t| get(t).to_value()));
        self.push(name, F::field_type(), Some(getter), None)
    }

    /// A field that can only be written, e.g. a setter that derives other state.
    pub fn write_only<F, S>(&mut self, name: &'static str, set: S) -> FieldSpec<'_>
    where
        F: MapValue + 'static,
        S: Fn(&mut T, F) + Send + Sync + 'static,
    {
        let owner = T::type_name();
        let setter: Setter = Arc::new(move |target: &mut dyn Any, value: Value| {
            let target = target
                .downcast_mut::<T>()
                .ok_or_else(|| ConversionError::ReceiverMismatch {
                    expected: owner.to_string(),
                })?;
            set(target, F::from_value(value)?);
            Ok(())
        });
        self.push(name, F::field_type(), None, Some(setter))
    }

    fn push(
        &mut self,
        name: &'static str,
        field_type: FieldType,
        getter: Option<Getter>,
        setter: Option<Setter>,
    ) -> FieldSpec<'_> {
        // redeclaring a field replaces it
        self.fields.retain(|f| f.name != name);
        self.fields.push(FieldDescriptor {
            name,
            field_type,
            markers: FieldMarkers::default(),
            owner: T::type_name(),
            getter,
            setter,
        });
        let index = self.fields.len() - 1;
        FieldSpec {
            field: &mut self.fields[index],
        }
    }
}

/// Handle for attaching markers to the field just declared.
pub struct FieldSpec<'a> {
    field: &'a mut FieldDescriptor,
}

impl<'a> FieldSpec<'a> {
    /// Exclude this field from mapping.
    pub fn ignore_map(self) -> Self {
        self.field.markers.ignore = true;
        self
    }

    /// When read as a source, write into the destination field `name`.
    pub fn map_to(self, name: &str) -> Self {
        self.field.markers.map_to = Some(name.to_string());
        self
    }
}
