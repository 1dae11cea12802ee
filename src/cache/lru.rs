//! Recency List Module
//!
//! Arena-backed doubly linked list holding cache entries in access order.
//!
//! Slots live in a `Vec` and link to each other by index, so the index map
//! can hold a plain [`Handle`] instead of a reference into the list. Freed
//! slots are chained into a free list and reused by later inserts.

use crate::cache::CacheEntry;

const NIL: usize = usize::MAX;

/// Stable reference to an entry's slot in a [`RecencyList`].
///
/// A handle stays valid until the entry it names is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(usize);

#[derive(Debug)]
struct Slot {
    /// `None` while the slot sits on the free list
    entry: Option<CacheEntry>,
    prev: usize,
    next: usize,
}

// == Recency List ==
/// Entries ordered by recency of use.
///
/// - Front = Most recently used
/// - Back = Least recently used
#[derive(Debug)]
pub struct RecencyList {
    slots: Vec<Slot>,
    head: usize,
    tail: usize,
    free: usize,
    len: usize,
}

impl Default for RecencyList {
    fn default() -> Self {
        Self::new()
    }
}

impl RecencyList {
    // == Constructor ==
    /// Creates a new empty list.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates an empty list with room for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            free: NIL,
            len: 0,
        }
    }

    // == Push Front ==
    /// Inserts an entry as the most recently used and returns its handle.
    pub fn push_front(&mut self, entry: CacheEntry) -> Handle {
        let idx = self.alloc(entry);
        self.link_front(idx);
        self.len += 1;
        Handle(idx)
    }

    // == Push Back ==
    /// Inserts an entry as the least recently used. Used when rebuilding a
    /// list from front-to-back snapshot order.
    pub fn push_back(&mut self, entry: CacheEntry) -> Handle {
        let idx = self.alloc(entry);
        self.slots[idx].prev = self.tail;
        self.slots[idx].next = NIL;
        if self.tail != NIL {
            self.slots[self.tail].next = idx;
        } else {
            self.head = idx;
        }
        self.tail = idx;
        self.len += 1;
        Handle(idx)
    }

    // == Move To Front ==
    /// Marks the entry as most recently used.
    pub fn move_to_front(&mut self, handle: Handle) {
        if self.head == handle.0 || self.get(handle).is_none() {
            return;
        }
        self.unlink(handle.0);
        self.link_front(handle.0);
    }

    // == Remove ==
    /// Unlinks the entry and returns it. Returns None for a stale handle.
    pub fn remove(&mut self, handle: Handle) -> Option<CacheEntry> {
        let idx = handle.0;
        let entry = self.slots.get_mut(idx)?.entry.take()?;
        self.unlink(idx);
        self.slots[idx].next = self.free;
        self.free = idx;
        self.len -= 1;
        Some(entry)
    }

    // == Back ==
    /// Handle of the least recently used entry, if any.
    pub fn back(&self) -> Option<Handle> {
        (self.tail != NIL).then_some(Handle(self.tail))
    }

    /// Handle of the most recently used entry, if any.
    pub fn front(&self) -> Option<Handle> {
        (self.head != NIL).then_some(Handle(self.head))
    }

    pub fn get(&self, handle: Handle) -> Option<&CacheEntry> {
        self.slots.get(handle.0).and_then(|slot| slot.entry.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut CacheEntry> {
        self.slots
            .get_mut(handle.0)
            .and_then(|slot| slot.entry.as_mut())
    }

    // == Length ==
    /// Returns the number of linked entries.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates entries from most to least recently used.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            current: self.head,
            remaining: self.len,
        }
    }

    // == Internal linking ==

    fn alloc(&mut self, entry: CacheEntry) -> usize {
        let slot = Slot {
            entry: Some(entry),
            prev: NIL,
            next: NIL,
        };
        if self.free != NIL {
            let idx = self.free;
            self.free = self.slots[idx].next;
            self.slots[idx] = slot;
            idx
        } else {
            self.slots.push(slot);
            self.slots.len() - 1
        }
    }

    fn link_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn unlink(&mut self, idx: usize) {
        let prev = self.slots[idx].prev;
        let next = self.slots[idx].next;

        if prev != NIL {
            self.slots[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.slots[next].prev = prev;
        } else {
            self.tail = prev;
        }

        self.slots[idx].prev = NIL;
        self.slots[idx].next = NIL;
    }
}

/// Front-to-back iterator over a [`RecencyList`].
pub struct Iter<'a> {
    list: &'a RecencyList,
    current: usize,
    remaining: usize,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a CacheEntry;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current == NIL || self.remaining == 0 {
            return None;
        }
        let slot = &self.list.slots[self.current];
        self.current = slot.next;
        self.remaining -= 1;
        slot.entry.as_ref()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
