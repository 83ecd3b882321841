//! Entry record stored by [`ConcurrentMap`](super::ConcurrentMap)

/// One stored key-value association
///
/// Entries handed out by [`ConcurrentMap::to_entries`](super::ConcurrentMap::to_entries)
/// are copies; mutating them never affects the container.
///
/// The insertion index is the container's size at the moment the entry was
/// inserted. It is advisory: concurrent removals can make two entries share an
/// index, so it is neither unique nor an ordering key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<K, V> {
    key: K,
    value: V,
    index: usize,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V, index: usize) -> Self {
        Self { key, value, index }
    }

    /// The key of this entry
    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// The stored value
    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Insertion index recorded when the entry was created
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Split the entry into its key and value
    pub fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }

    pub(crate) fn set_value(&mut self, value: V) -> V {
        core::mem::replace(&mut self.value, value)
    }
}
