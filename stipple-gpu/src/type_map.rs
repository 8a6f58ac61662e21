use std::{
    any::{Any, TypeId},
    collections::HashMap,
};

/// Map holding at most one value per type.
#[derive(Default)]
pub struct TypeMap {
    inner: HashMap<TypeId, Box<dyn Any>>,
}

impl TypeMap {
    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.inner
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.inner
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut())
    }

    /// Get the value for type T, inserting `T::default()` first if absent.
    pub fn get_or_default<T: 'static + Default>(&mut self) -> &mut T {
        let slot = self
            .inner
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match slot.downcast_mut() {
            Some(value) => value,
            None => unreachable!("TypeMap entries are keyed by their own TypeId"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_separated_by_type() {
        let mut map = TypeMap::default();
        *map.get_or_default::<u32>() += 3;
        map.get_or_default::<Vec<&str>>().push("batch");

        assert_eq!(map.get::<u32>(), Some(&3));
        assert_eq!(map.get::<Vec<&str>>().map(Vec::len), Some(1));
        assert!(map.get::<u64>().is_none());
    }
}
