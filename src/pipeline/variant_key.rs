//! Variant Keys
//!
//! A [`VariantKey`] maps slot names to the expressions that fill them. It is the
//! identity of one shader variant: the compiled-shader cache is addressed by the
//! template plus the key entries the template actually references.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_variants::pipeline::{SlotType, VariantKey};
//!
//! let mut key = VariantKey::new();
//! key.set_typed("out_color", "input.color", SlotType::Vec4);
//! key.set("out_position", "input.position");
//!
//! // Construction order never matters
//! let hash = key.compute_hash();
//! ```

use std::hash::{Hash, Hasher};

use super::template::SlotType;

/// The expression filling one slot, tagged with its type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotValue {
    pub expr: String,
    pub ty: SlotType,
}

impl SlotValue {
    #[must_use]
    pub fn new(expr: impl Into<String>, ty: SlotType) -> Self {
        Self {
            expr: expr.into(),
            ty,
        }
    }

    /// An expression with no declared type; accepted by every slot.
    #[must_use]
    pub fn untyped(expr: impl Into<String>) -> Self {
        Self::new(expr, SlotType::Any)
    }
}

/// An ordered collection of slot assignments.
///
/// Internally an ordered `Vec<(String, SlotValue)>` sorted by slot name, so two
/// keys with the same assignments compare and hash equal no matter how they
/// were built.
///
/// # Performance
///
/// - Insertion/lookup: O(log n) binary search
/// - Hash computation: O(n)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantKey {
    entries: Vec<(String, SlotValue)>,
}

impl VariantKey {
    /// Create empty key
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Create key with pre-allocated capacity
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Assign an untyped expression to a slot.
    pub fn set(&mut self, slot: &str, expr: &str) {
        self.insert(slot, SlotValue::untyped(expr));
    }

    /// Assign a typed expression to a slot.
    pub fn set_typed(&mut self, slot: &str, expr: &str, ty: SlotType) {
        self.insert(slot, SlotValue::new(expr, ty));
    }

    /// Insert a value (maintains sorted order).
    ///
    /// If the slot is already assigned its value is replaced.
    pub fn insert(&mut self, slot: &str, value: SlotValue) {
        match self.search(slot) {
            Ok(idx) => self.entries[idx].1 = value,
            Err(idx) => self.entries.insert(idx, (slot.to_string(), value)),
        }
    }

    /// Builder form of [`set_typed`](Self::set_typed).
    #[must_use]
    pub fn with(mut self, slot: &str, expr: &str, ty: SlotType) -> Self {
        self.set_typed(slot, expr, ty);
        self
    }

    pub fn remove(&mut self, slot: &str) -> bool {
        if let Ok(idx) = self.search(slot) {
            self.entries.remove(idx);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn contains(&self, slot: &str) -> bool {
        self.search(slot).is_ok()
    }

    #[must_use]
    pub fn get(&self, slot: &str) -> Option<&SlotValue> {
        self.search(slot).ok().map(|idx| &self.entries[idx].1)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate assignments in slot-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SlotValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge assignments from another key.
    ///
    /// On conflict, values from `other` win.
    pub fn merge(&mut self, other: &VariantKey) {
        for (slot, value) in &other.entries {
            self.insert(slot, value.clone());
        }
    }

    #[must_use]
    pub fn merged_with(&self, other: &VariantKey) -> VariantKey {
        let mut result = self.clone();
        result.merge(other);
        result
    }

    /// Compute content hash (for quick lookups; the cache itself is
    /// addressed by [`ShaderCacheKey`](super::ShaderCacheKey)).
    #[must_use]
    pub fn compute_hash(&self) -> u64 {
        use std::hash::BuildHasher;

        rustc_hash::FxBuildHasher.hash_one(self)
    }

    fn search(&self, slot: &str) -> Result<usize, usize> {
        self.entries.binary_search_by(|(k, _)| k.as_str().cmp(slot))
    }
}

impl Hash for VariantKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entries.hash(state);
    }
}

/// Create an untyped `VariantKey` from a list of assignments
impl From<&[(&str, &str)]> for VariantKey {
    fn from(entries: &[(&str, &str)]) -> Self {
        let mut result = Self::with_capacity(entries.len());
        for (slot, expr) in entries {
            result.set(slot, expr);
        }
        result
    }
}

impl<const N: usize> From<[(&str, &str); N]> for VariantKey {
    fn from(entries: [(&str, &str); N]) -> Self {
        Self::from(&entries[..])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get() {
        let mut key = VariantKey::new();
        key.set("out_color", "input.color");
        key.set_typed("out_position", "input.position", SlotType::Vec3);

        assert!(key.contains("out_color"));
        assert!(key.contains("out_position"));
        assert!(!key.contains("out_normal"));

        assert_eq!(key.get("out_color").map(|v| v.expr.as_str()), Some("input.color"));
        assert_eq!(key.get("out_position").map(|v| v.ty), Some(SlotType::Vec3));
    }

    #[test]
    fn test_ordering() {
        let mut key = VariantKey::new();
        key.set("b", "1");
        key.set("a", "1");
        key.set("c", "1");

        let names: Vec<_> = key.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_overwrite() {
        let mut key = VariantKey::new();
        key.set("a", "1");
        key.set("a", "2");

        assert_eq!(key.len(), 1);
        assert_eq!(key.get("a").map(|v| v.expr.as_str()), Some("2"));
    }

    #[test]
    fn test_merge() {
        let mut k1 = VariantKey::new();
        k1.set("a", "1");
        k1.set("b", "2");

        let mut k2 = VariantKey::new();
        k2.set("b", "3");
        k2.set("c", "4");

        k1.merge(&k2);

        assert_eq!(k1.get("a").map(|v| v.expr.as_str()), Some("1"));
        assert_eq!(k1.get("b").map(|v| v.expr.as_str()), Some("3")); // Overwritten
        assert_eq!(k1.get("c").map(|v| v.expr.as_str()), Some("4"));
    }

    #[test]
    fn test_remove() {
        let mut key = VariantKey::from([("a", "1"), ("b", "2")]);
        assert!(key.remove("a"));
        assert!(!key.remove("a"));
        assert_eq!(key.len(), 1);
    }

    #[test]
    fn test_hash_consistency() {
        let mut k1 = VariantKey::new();
        k1.set("a", "1");
        k1.set("b", "2");

        let mut k2 = VariantKey::new();
        k2.set("b", "2");
        k2.set("a", "1");

        assert_eq!(k1, k2);
        assert_eq!(k1.compute_hash(), k2.compute_hash());
    }

    #[test]
    fn test_type_is_part_of_identity() {
        let typed = VariantKey::new().with("a", "x", SlotType::Vec3);
        let untyped = VariantKey::from([("a", "x")]);
        assert_ne!(typed, untyped);
    }
}
