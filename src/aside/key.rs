//! Invocation keys built from dynamically typed argument tuples.
//!
//! ## Key Components
//!
//! - [`KeyComponent`]: object-safe view of one argument. Anything that is
//!   `Eq + Hash + Send + Sync + 'static` qualifies through the blanket
//!   impl; equality and hashing stay type-aware across the trait object.
//! - [`InvocationKey`]: an immutable tuple of components with a
//!   precomputed hash, usable directly as a cache key.
//! - [`component`]: wraps a value as an `Arc<dyn KeyComponent>`.
//!
//! ## Implementation Notes
//!
//! - Two components of different concrete types are never equal, even
//!   when their bytes would match. The component's `TypeId` is hashed
//!   ahead of its value so `1u32` and `1u64` land apart.
//! - The tuple hash is computed once at construction. Key comparison
//!   checks it first and falls back to per-component equality only on a
//!   hash match.
//! - The empty tuple is a valid key: every zero-component invocation of
//!   a method maps to the same entry.

use std::any::{Any, TypeId};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHasher;

/// One dynamically typed component of an [`InvocationKey`].
pub trait KeyComponent: Any + Send + Sync {
    /// The component as `Any`, for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Type-aware equality against another component.
    fn dyn_eq(&self, other: &dyn KeyComponent) -> bool;

    /// Feed the component's type and value into `hasher`.
    fn dyn_hash(&self, hasher: &mut dyn Hasher);
}

impl<T> KeyComponent for T
where
    T: Any + Eq + Hash + Send + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn KeyComponent) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self == other,
            None => false,
        }
    }

    fn dyn_hash(&self, mut hasher: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut hasher);
        self.hash(&mut hasher);
    }
}

/// Wrap a value as a shareable key component.
pub fn component<T>(value: T) -> Arc<dyn KeyComponent>
where
    T: Any + Eq + Hash + Send + Sync,
{
    Arc::new(value)
}

/// Immutable tuple of key components with a precomputed hash.
#[derive(Clone)]
pub struct InvocationKey {
    parts: Arc<[Arc<dyn KeyComponent>]>,
    hash: u64,
}

impl InvocationKey {
    /// Build a key from components in tuple order.
    pub fn new(parts: Vec<Arc<dyn KeyComponent>>) -> Self {
        let mut hasher = FxHasher::default();
        parts.len().hash(&mut hasher);
        for part in &parts {
            part.dyn_hash(&mut hasher);
        }
        Self {
            parts: parts.into(),
            hash: hasher.finish(),
        }
    }

    /// The zero-component key.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether this is the zero-component key.
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl PartialEq for InvocationKey {
    fn eq(&self, other: &Self) -> bool {
        if self.hash != other.hash || self.parts.len() != other.parts.len() {
            return false;
        }
        self.parts
            .iter()
            .zip(other.parts.iter())
            .all(|(mine, theirs)| mine.dyn_eq(theirs.as_ref()))
    }
}

impl Eq for InvocationKey {}

impl Hash for InvocationKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl std::fmt::Debug for InvocationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvocationKey")
            .field("parts", &self.parts.len())
            .field("hash", &self.hash)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::*;

    fn hash_of(key: &InvocationKey) -> u64 {
        let mut hasher = FxHasher::default();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_components_make_equal_keys() {
        let a = InvocationKey::new(vec![component(1u64), component("a".to_string())]);
        let b = InvocationKey::new(vec![component(1u64), component("a".to_string())]);
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn differing_component_breaks_equality() {
        let a = InvocationKey::new(vec![component(1u64), component("a".to_string())]);
        let b = InvocationKey::new(vec![component(1u64), component("b".to_string())]);
        assert_ne!(a, b);
    }

    #[test]
    fn component_order_matters() {
        let a = InvocationKey::new(vec![component(1u64), component("a".to_string())]);
        let b = InvocationKey::new(vec![component("a".to_string()), component(1u64)]);
        assert_ne!(a, b);
    }

    #[test]
    fn same_bits_different_types_are_distinct() {
        let a = InvocationKey::new(vec![component(1u32)]);
        let b = InvocationKey::new(vec![component(1u64)]);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_keys_are_all_equal() {
        assert_eq!(InvocationKey::empty(), InvocationKey::new(Vec::new()));
        assert!(InvocationKey::empty().is_empty());
        assert_eq!(InvocationKey::empty().len(), 0);
    }

    #[test]
    fn works_as_a_hash_map_key() {
        let mut map: FxHashMap<InvocationKey, &str> = FxHashMap::default();
        map.insert(
            InvocationKey::new(vec![component(7i64), component(true)]),
            "seven",
        );

        let probe = InvocationKey::new(vec![component(7i64), component(true)]);
        assert_eq!(map.get(&probe), Some(&"seven"));

        let other = InvocationKey::new(vec![component(8i64), component(true)]);
        assert_eq!(map.get(&other), None);
    }
}
