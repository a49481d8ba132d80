// src/frontier/queue.rs
// =============================================================================
// The FIFO ring buffer that holds a shard's not-yet-offered URLs.
//
// How it works:
// 1. Items live in a Vec<Option<T>> used as a circular buffer
// 2. `head` points at the oldest item, `len` counts live items
// 3. push() writes at (head + len) % capacity
// 4. When the buffer is full, capacity doubles and the live items are
//    copied across in order, so the oldest item lands at index 0 again
//
// Why not VecDeque?
// - The shard needs an explicit, testable growth policy (start at 2,
//   double when full) and we want every slot reset to None on pop so the
//   String is dropped as soon as it leaves the queue
// =============================================================================

const INITIAL_CAPACITY: usize = 2;

/// Growable FIFO queue backed by a circular buffer.
#[derive(Debug)]
pub struct FrontierQueue<T> {
    buffer: Vec<Option<T>>,
    head: usize,
    len: usize,
}

impl<T> FrontierQueue<T> {
    pub fn new() -> Self {
        Self {
            buffer: empty_slots(INITIAL_CAPACITY),
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Appends an item at the tail, doubling the buffer first if it is full.
    pub fn push(&mut self, item: T) {
        if self.len == self.buffer.len() {
            self.grow();
        }

        let tail = (self.head + self.len) % self.buffer.len();
        self.buffer[tail] = Some(item);
        self.len += 1;
    }

    /// Removes and returns the oldest item, or None when empty.
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }

        let item = self.buffer[self.head].take();
        self.head = (self.head + 1) % self.buffer.len();
        self.len -= 1;
        item
    }

    // Unrolls the ring into a buffer twice the size, oldest item first.
    fn grow(&mut self) {
        let capacity = self.buffer.len();
        let mut grown = empty_slots(capacity * 2);
        for (offset, slot) in grown.iter_mut().take(self.len).enumerate() {
            *slot = self.buffer[(self.head + offset) % capacity].take();
        }

        self.buffer = grown;
        self.head = 0;
    }
}

impl<T> Default for FrontierQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Extend<T> for FrontierQueue<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

fn empty_slots<T>(capacity: usize) -> Vec<Option<T>> {
    std::iter::repeat_with(|| None).take(capacity).collect()
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Option<T> slots?
//    - A Vec<T> must always hold initialized values
//    - Option lets a slot be "empty" (None) after pop()
//    - take() moves the value out and leaves None behind in one step
//
// 2. What does % do here?
//    - Wraps an index back to 0 when it walks past the end
//    - That is what makes the buffer "circular"
//
// 3. Why repeat_with instead of vec![None; n]?
//    - vec![x; n] needs x: Clone, and T might not be Clone
//    - repeat_with builds a fresh None each time, no Clone needed
// -----------------------------------------------------------------------------
