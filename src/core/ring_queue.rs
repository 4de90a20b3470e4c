//! Resizable FIFO ring buffer for deferred work items.
//!
//! The buffer doubles when full and halves when usage drops below a quarter
//! of its capacity, never shrinking past the construction-time floor. This
//! keeps memory proportional to recent peak load.
//!
//! One slot is always kept unused so `head == tail` unambiguously means
//! empty; dequeued slots are cleared immediately so ownership of removed
//! items is released as soon as they leave the queue.

/// Default logical capacity when none is given.
pub const DEFAULT_CAPACITY: usize = 2;

/// A growable, shrinkable circular FIFO queue.
///
/// Insertion order is execution order: no reordering, no priorities.
/// `enqueue` and `dequeue` are amortized O(1).
#[derive(Debug)]
pub struct RingQueue<T> {
    /// Slot storage; `None` marks an unoccupied slot.
    storage: Vec<Option<T>>,
    /// Slot count the buffer never shrinks below.
    initial_slots: usize,
    head: usize,
    tail: usize,
}

impl<T> Default for RingQueue<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl<T> RingQueue<T> {
    /// Create a queue that holds `capacity` items before its first resize.
    ///
    /// One extra slot is allocated as the empty/full sentinel gap.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let slots = capacity + 1;
        Self {
            storage: (0..slots).map(|_| None).collect(),
            initial_slots: slots,
            head: 0,
            tail: 0,
        }
    }

    /// Whether the queue holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        let slots = self.storage.len();
        (self.tail + slots - self.head) % slots
    }

    /// Peek at the oldest item without removing it.
    #[must_use]
    pub fn head(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        self.storage[self.head].as_ref()
    }

    /// Append an item at the tail, growing the buffer first if it is full.
    pub fn enqueue(&mut self, item: T) {
        let slots = self.storage.len();
        if (self.tail + 1) % slots == self.head {
            self.resize(slots * 2);
        }
        self.storage[self.tail] = Some(item);
        self.tail = (self.tail + 1) % self.storage.len();
    }

    /// Remove and return the oldest item, or `None` when empty.
    ///
    /// After removal the buffer halves if usage fell below a quarter of its
    /// capacity and the halved size still respects the initial floor.
    pub fn dequeue(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.storage[self.head].take();
        self.head = (self.head + 1) % self.storage.len();

        let slots = self.storage.len();
        if self.len() < slots / 4 && slots / 2 >= self.initial_slots {
            self.resize(slots / 2);
        }

        item
    }

    /// Copy live items into a fresh buffer of `new_slots` slots, re-indexed
    /// so that `head = 0`. Shared by growth and shrink.
    fn resize(&mut self, new_slots: usize) {
        let count = self.len();
        let slots = self.storage.len();
        let mut new_storage: Vec<Option<T>> = (0..new_slots).map(|_| None).collect();
        for (index, slot) in new_storage.iter_mut().take(count).enumerate() {
            *slot = self.storage[(self.head + index) % slots].take();
        }
        self.storage = new_storage;
        self.head = 0;
        self.tail = count;
    }
}
