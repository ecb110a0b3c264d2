use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::descriptor::{TypeDescriptor, TypeKey};

/// Memoizes type descriptors so each type is described once.
///
/// Entries are never evicted. The descriptor is computed outside the lock:
/// two threads asking for the same new type may both compute it, the first
/// insert wins and the results are identical.
#[derive(Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<TypeKey, Arc<TypeDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: TypeKey) -> Arc<TypeDescriptor> {
        if let Some(found) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(found);
        }

        let computed = Arc::new(key.describe());
        tracing::trace!(
            type_name = key.name(),
            fields = computed.fields().len(),
            "computed field descriptors"
        );

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert(computed))
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
