//! Fixed-capacity ring buffer that overwrites its oldest entry.

/// Ring buffer over a preallocated arena.
///
/// Once full, each push overwrites the oldest slot, so memory stays at
/// `capacity` entries no matter how many values are pushed.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    /// Backing arena, never longer than `capacity`
    slots: Vec<T>,
    /// Index of the oldest entry once the buffer is full
    head: usize,
    /// Maximum number of slots
    capacity: usize,
}

impl<T> RingBuffer<T> {
    /// Create a ring holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: Vec::with_capacity(capacity),
            head: 0,
            capacity,
        }
    }

    /// Append `value`, overwriting the oldest entry when full.
    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when nothing has been pushed since creation or the last clear.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of entries held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }

    /// Entries from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (newer, older) = self.slots.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// The newest `n` entries, oldest first.
    pub fn newest(&self, n: usize) -> impl Iterator<Item = &T> + '_ {
        self.iter().skip(self.len().saturating_sub(n))
    }

    /// The newest entry.
    pub fn last(&self) -> Option<&T> {
        self.iter().next_back()
    }
}

impl<T: Copy> RingBuffer<T> {
    /// Copy the entries out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().copied().collect()
    }
}
