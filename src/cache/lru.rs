//! LRU List Module
//!
//! Recency order for LRU eviction, stored as an arena of entries linked by
//! slot index instead of pointers.

use crate::cache::CacheEntry;

// == Handle ==
/// Stable reference to an entry's slot in the recency list.
///
/// A handle stays valid until its entry is removed; the slot may then be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug)]
struct Node<K, V> {
    entry: CacheEntry<K, V>,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU List ==
/// Doubly-linked recency order over an arena of entries.
///
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// Every operation except `clear` and iteration is O(1).
#[derive(Debug)]
pub struct LruList<K, V> {
    /// Entry slots, `None` when free
    slots: Vec<Option<Node<K, V>>>,
    /// Free slot indices available for reuse
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl<K, V> LruList<K, V> {
    // == Constructor ==
    /// Creates an empty list with room for `capacity` entries before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts an entry as most recently used and returns its handle.
    pub fn push_front(&mut self, entry: CacheEntry<K, V>) -> Handle {
        let node = Node {
            entry,
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.slots[idx] = Some(node);
                idx
            }
            None => {
                self.slots.push(Some(node));
                self.slots.len() - 1
            }
        };
        self.link_front(idx);
        self.len += 1;
        Handle(idx)
    }

    // == Move To Front ==
    /// Marks an entry as most recently used.
    pub fn move_to_front(&mut self, handle: Handle) {
        if self.head == Some(handle.0) || self.node(handle.0).is_none() {
            return;
        }
        self.unlink(handle.0);
        self.link_front(handle.0);
    }

    // == Remove ==
    /// Removes an entry by handle and frees its slot.
    pub fn remove(&mut self, handle: Handle) -> Option<CacheEntry<K, V>> {
        self.node(handle.0)?;
        self.unlink(handle.0);
        let node = self.slots[handle.0].take()?;
        self.free.push(handle.0);
        self.len -= 1;
        Some(node.entry)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry<K, V>> {
        let tail = self.tail?;
        self.remove(Handle(tail))
    }

    pub fn get(&self, handle: Handle) -> Option<&CacheEntry<K, V>> {
        self.node(handle.0).map(|node| &node.entry)
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut CacheEntry<K, V>> {
        self.slots
            .get_mut(handle.0)
            .and_then(Option::as_mut)
            .map(|node| &mut node.entry)
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    // == Clear ==
    /// Drops every entry and releases all slots.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
        self.len = 0;
    }

    /// Iterates entries from least to most recently used.
    pub fn iter_oldest_first(&self) -> OldestFirst<'_, K, V> {
        OldestFirst {
            list: self,
            cursor: self.tail,
        }
    }

    fn node(&self, idx: usize) -> Option<&Node<K, V>> {
        self.slots.get(idx).and_then(Option::as_ref)
    }

    fn set_prev(&mut self, idx: usize, prev: Option<usize>) {
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = prev;
        }
    }

    fn set_next(&mut self, idx: usize, next: Option<usize>) {
        if let Some(node) = self.slots[idx].as_mut() {
            node.next = next;
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.node(idx) {
            Some(node) => (node.prev, node.next),
            None => return,
        };
        match prev {
            Some(p) => self.set_next(p, next),
            None => self.head = next,
        }
        match next {
            Some(n) => self.set_prev(n, prev),
            None => self.tail = prev,
        }
        self.set_prev(idx, None);
        self.set_next(idx, None);
    }

    fn link_front(&mut self, idx: usize) {
        let old_head = self.head;
        self.set_prev(idx, None);
        self.set_next(idx, old_head);
        match old_head {
            Some(h) => self.set_prev(h, Some(idx)),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }
}

/// Iterator over entries from least to most recently used.
pub struct OldestFirst<'a, K, V> {
    list: &'a LruList<K, V>,
    cursor: Option<usize>,
}

impl<'a, K, V> Iterator for OldestFirst<'a, K, V> {
    type Item = &'a CacheEntry<K, V>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.list.node(self.cursor?)?;
        self.cursor = node.prev;
        Some(&node.entry)
    }
}
