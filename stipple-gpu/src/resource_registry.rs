use crate::resource::{Handle, ResourceType};
use crate::type_map::TypeMap;
use std::collections::HashMap;

/// Registry mapping handles to actual wgpu resources
/// Provides type-safe resource lookup and management
#[derive(Default)]
pub struct ResourceRegistry {
    resources: TypeMap,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource and return its handle
    pub fn insert<T: ResourceType>(&mut self, resource: T) -> Handle<T> {
        let handle = Handle::next();
        self.resources
            .get_or_default::<HashMap<u64, T>>()
            .insert(handle.id, resource);
        handle
    }

    /// Get a resource by handle
    pub fn get<T: ResourceType>(&self, handle: Handle<T>) -> Option<&T> {
        self.resources
            .get::<HashMap<u64, T>>()
            .and_then(|map| map.get(&handle.id))
    }

    /// Remove a resource, handing ownership back to the caller
    pub fn remove<T: ResourceType>(&mut self, handle: Handle<T>) -> Option<T> {
        self.resources
            .get_mut::<HashMap<u64, T>>()
            .and_then(|map| map.remove(&handle.id))
    }

    /// Number of live resources of type T
    pub fn count<T: ResourceType>(&self) -> usize {
        self.resources
            .get::<HashMap<u64, T>>()
            .map_or(0, HashMap::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct FakeBuffer(usize);

    impl ResourceType for FakeBuffer {}

    #[test]
    fn test_insert_get_remove() {
        let mut registry = ResourceRegistry::new();
        let a = registry.insert(FakeBuffer(1000));
        let b = registry.insert(FakeBuffer(500));
        assert_ne!(a, b);
        assert_eq!(registry.count::<FakeBuffer>(), 2);
        assert_eq!(registry.get(b), Some(&FakeBuffer(500)));

        assert_eq!(registry.remove(a), Some(FakeBuffer(1000)));
        assert_eq!(registry.remove(a), None);
        assert!(registry.get(a).is_none());
        assert_eq!(registry.count::<FakeBuffer>(), 1);
    }
}
