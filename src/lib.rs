// Object-to-object mapping engine
mod conversion;
pub mod descriptor;
pub mod descriptor_cache;
pub mod diagnostics;
pub mod error;
pub mod field_type;
pub mod mapper;
pub mod profile;
pub mod registry;
pub mod type_mapping;
pub mod value;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export core types for convenience
pub use descriptor::{AnyRecord, FieldDescriptor, FieldMarkers, Mappable, ShapeBuilder, TypeDescriptor, TypeKey};
pub use descriptor_cache::DescriptorCache;
pub use diagnostics::{
    CollectingSink, DiagnosticKind, DiagnosticsSink, MappingDiagnostic, MappingReport, MappingReporter,
    ReportFormat, TracingSink,
};
pub use error::{ConfigError, ConversionError};
pub use field_type::{EnumShape, FieldType, IntKind, MapValue, TypeCategory};
pub use mapper::{MapExt, MapListExt, Mapper};
pub use profile::{FieldDeclaration, MappingDeclaration, MappingProfile, ProfileDocument};
pub use registry::{MapperConfiguration, MemberExpression, TypeMapExpression};
pub use type_mapping::{FieldOverride, MappingOptions, TypeMapping, TypePairKey, ValueResolver};
pub use value::{EnumValue, ObjectRef, Seq, SeqKind, Value};
