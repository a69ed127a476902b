//! Shared handles to live model instances.

use std::fmt;
use std::slice;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Handle to one live entity.
///
/// Clones share the same instance; reconciliation mutates that instance in
/// place, so a handle taken before a poll observes the values after it.
pub struct Live<T>(Arc<RwLock<T>>);

impl<T> Live<T> {
    pub(crate) fn new(value: T) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// Read the current values.
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, T> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles refer to the same instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Live<T> {
    /// Detached copy of the current values.
    #[must_use]
    pub fn snapshot(&self) -> T {
        self.read().clone()
    }
}

impl<T> Clone for Live<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Live<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Live").field(&*self.read()).finish()
    }
}

/// Ordered collection of live entities with unique identity keys.
pub struct LiveList<T> {
    items: Vec<Live<T>>,
}

impl<T> LiveList<T> {
    /// Empty list.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Number of live entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Handles in display order.
    pub fn iter(&self) -> slice::Iter<'_, Live<T>> {
        self.items.iter()
    }

    /// Handle at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Live<T>> {
        self.items.get(index)
    }

    pub(crate) fn push(&mut self, item: Live<T>) {
        self.items.push(item);
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Live<T>) -> bool) {
        self.items.retain(keep);
    }
}

impl<T> Default for LiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.iter()).finish()
    }
}

impl<'a, T> IntoIterator for &'a LiveList<T> {
    type Item = &'a Live<T>;
    type IntoIter = slice::Iter<'a, Live<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_one_instance() {
        let first = Live::new(1_u32);
        let second = first.clone();
        *first.write() = 7;
        assert_eq!(*second.read(), 7);
        assert!(first.ptr_eq(&second));
        assert!(!first.ptr_eq(&Live::new(7)));
    }

    #[test]
    fn retain_keeps_surviving_handles() {
        let mut list = LiveList::new();
        for value in 0..4_u32 {
            list.push(Live::new(value));
        }
        let kept = list.get(2).cloned().expect("third item");
        list.retain(|item| *item.read() % 2 == 0);
        assert_eq!(list.len(), 2);
        assert!(list.iter().any(|item| item.ptr_eq(&kept)));
    }
}
