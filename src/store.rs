//! Insertion-ordered collections with uniqueness enforced by equality.
//!
//! [`UniqueStore`] backs every collection in the management system: the
//! registry's manager list, both listener lists, and the sync tracker's
//! target set. Uniqueness uses the element type's `PartialEq`, which for
//! manager and listener handles is reference identity and for tags is
//! value equality.

use std::slice;

/// A list wrapper that rejects duplicate entries while preserving
/// insertion order.
///
/// Iteration yields elements in the order they were first added.
#[derive(Debug, Clone)]
pub struct UniqueStore<T> {
    items: Vec<T>,
}

impl<T: PartialEq> UniqueStore<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Adds the given item to the store.
    ///
    /// # Returns
    /// * `true` if the item was inserted
    /// * `false` if an equal item is already present
    pub fn add(&mut self, item: T) -> bool {
        if self.items.contains(&item) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Removes the first item equal to the given one.
    ///
    /// # Returns
    /// * `true` if an item was removed
    /// * `false` if no equal item was present
    pub fn remove(&mut self, item: &T) -> bool {
        match self.items.iter().position(|existing| existing == item) {
            Some(index) => {
                self.items.remove(index);
                true
            }
            None => false,
        }
    }

    /// Checks whether an equal item is contained within the store.
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }
}

impl<T> UniqueStore<T> {
    /// Iterates current elements in insertion order.
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keeps only the elements for which the predicate holds, preserving
    /// order. Used by notification paths to drop dead observer handles.
    pub fn retain<F>(&mut self, f: F)
    where
        F: FnMut(&T) -> bool,
    {
        self.items.retain(f);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: PartialEq> Default for UniqueStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T> IntoIterator for &'a UniqueStore<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
