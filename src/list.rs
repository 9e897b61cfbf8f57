use core::fmt;
use core::mem;
use core::num::NonZeroUsize;

/// Most nodes reserved up front. Capacity is an upper bound, so larger lists
/// grow on demand instead of allocating every slot at construction.
pub(crate) const PREALLOC_LIMIT: usize = 4096;

/// Index of the head sentinel. The node after it is the most recently used.
const HEAD: usize = 0;
/// Index of the tail sentinel. The node before it is the least recently used.
const TAIL: usize = 1;

/// Handle to a node stored in a [`List`].
///
/// A slot stays valid until the node it names is removed from the list. After
/// that the index may be handed out again for a different value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Slot(usize);

/// A node in the doubly linked list.
///
/// Links are indices into the owning list's arena. Sentinel nodes carry no
/// value, and neither do vacant nodes waiting on the free list.
struct Entry<T> {
    val: Option<T>,
    prev: usize,
    next: usize,
}

impl<T> Entry<T> {
    fn new(val: T) -> Self {
        Entry {
            val: Some(val),
            prev: HEAD,
            next: TAIL,
        }
    }

    fn new_sigil() -> Self {
        Entry {
            val: None,
            prev: HEAD,
            next: TAIL,
        }
    }
}

/// A doubly linked list with fixed capacity backed by an index arena.
///
/// Nodes live in a `Vec` and link to each other by index, with two sentinel
/// nodes (sigils) bracketing the live nodes so that attach and detach never
/// have to special-case the ends. Removed nodes are recycled through a free
/// list, so after warm-up the list stops allocating.
///
/// All operations are O(1).
pub(crate) struct List<T> {
    cap: NonZeroUsize,
    len: usize,
    entries: Vec<Entry<T>>,
    free: Vec<usize>,
}

impl<T> List<T> {
    /// Creates a new list that holds at most `cap` items.
    pub(crate) fn new(cap: NonZeroUsize) -> List<T> {
        let mut entries = Vec::with_capacity(cap.get().min(PREALLOC_LIMIT).saturating_add(2));
        entries.push(Entry::new_sigil());
        entries.push(Entry::new_sigil());
        entries[HEAD].next = TAIL;
        entries[TAIL].prev = HEAD;

        List {
            cap,
            len: 0,
            entries,
            free: Vec::new(),
        }
    }

    pub(crate) fn cap(&self) -> NonZeroUsize {
        self.cap
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_full(&self) -> bool {
        self.len == self.cap.get()
    }

    /// Returns true if `slot` names a live (non-sentinel, non-vacant) node.
    fn is_live(&self, slot: Slot) -> bool {
        slot.0 != HEAD
            && slot.0 != TAIL
            && self.entries.get(slot.0).is_some_and(|e| e.val.is_some())
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.entries[idx].prev, self.entries[idx].next);
        self.entries[prev].next = next;
        self.entries[next].prev = prev;
    }

    /// Links `idx` directly after the head sentinel.
    fn attach(&mut self, idx: usize) {
        let first = self.entries[HEAD].next;
        self.entries[idx].prev = HEAD;
        self.entries[idx].next = first;
        self.entries[first].prev = idx;
        self.entries[HEAD].next = idx;
    }

    /// Adds a value to the front of the list.
    ///
    /// Returns the slot of the new node, or `None` if the list is full. The
    /// caller is expected to make room with [`remove_last`](Self::remove_last)
    /// first.
    pub(crate) fn add(&mut self, v: T) -> Option<Slot> {
        if self.is_full() {
            return None;
        }
        let idx = match self.free.pop() {
            Some(idx) => {
                self.entries[idx] = Entry::new(v);
                idx
            }
            None => {
                self.entries.push(Entry::new(v));
                self.entries.len() - 1
            }
        };
        self.attach(idx);
        self.len += 1;
        Some(Slot(idx))
    }

    /// Removes the last (least recently used) node and returns its value.
    pub(crate) fn remove_last(&mut self) -> Option<T> {
        let last = self.entries[TAIL].prev;
        if last == HEAD {
            return None;
        }
        self.detach(last);
        self.len -= 1;
        self.free.push(last);
        self.entries[last].val.take()
    }

    /// Moves a node to the front of the list. Does nothing for stale slots.
    pub(crate) fn move_to_front(&mut self, slot: Slot) {
        if !self.is_live(slot) || self.entries[HEAD].next == slot.0 {
            return;
        }
        self.detach(slot.0);
        self.attach(slot.0);
    }

    /// Replaces the value of a node, returning the previous value.
    pub(crate) fn update(&mut self, slot: Slot, v: T) -> Option<T> {
        if !self.is_live(slot) {
            return None;
        }
        self.entries[slot.0]
            .val
            .as_mut()
            .map(|old| mem::replace(old, v))
    }

    pub(crate) fn get(&self, slot: Slot) -> Option<&T> {
        if !self.is_live(slot) {
            return None;
        }
        self.entries[slot.0].val.as_ref()
    }

    /// Iterates values from the front (most recent) to the back.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: self,
            cursor: self.entries[HEAD].next,
        }
    }
}

impl<T> fmt::Debug for List<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("List")
            .field("capacity", &self.cap)
            .field("length", &self.len)
            .finish()
    }
}

/// Front-to-back iterator over a [`List`].
#[cfg(test)]
pub(crate) struct Iter<'a, T> {
    list: &'a List<T>,
    cursor: usize,
}

#[cfg(test)]
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.cursor == TAIL {
            return None;
        }
        let entry = &self.list.entries[self.cursor];
        self.cursor = entry.next;
        entry.val.as_ref()
    }
}
