//! Append-only worklist with a processing cursor
//!
//! Entries before the cursor have been expanded, entries after it are still
//! waiting. A second cursor tracks what has already been handed out for
//! redraw.

/// Worklist of found objects of one kind
#[derive(Debug, Clone)]
pub struct Frontier<T> {
    items: Vec<T>,
    cursor: usize,
    drawn: usize,
    capacity: usize,
}

impl<T: Copy> Frontier<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            cursor: 0,
            drawn: 0,
            capacity,
        }
    }

    /// Append an entry. Capacity is sized from the board at scan start, so
    /// running past it is a logic error.
    pub fn push(&mut self, item: T) {
        debug_assert!(
            self.items.len() < self.capacity,
            "frontier overflow (capacity {})",
            self.capacity
        );
        self.items.push(item);
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<T> {
        self.items.get(position).copied()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.items.len());
    }

    /// Unprocessed entries remain
    pub fn has_pending(&self) -> bool {
        self.cursor < self.items.len()
    }

    /// Take the next unprocessed entry and move the cursor past it
    pub fn advance(&mut self) -> Option<T> {
        let item = self.items.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(item)
    }

    /// Entries appended since the last call
    pub fn take_undrawn(&mut self) -> &[T] {
        let start = self.drawn;
        self.drawn = self.items.len();
        &self.items[start..]
    }

    /// Forget every entry, keeping the allocation
    pub fn clear(&mut self) {
        self.items.clear();
        self.cursor = 0;
        self.drawn = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_tracks_processing() {
        let mut frontier = Frontier::with_capacity(4);
        frontier.push(10);
        frontier.push(11);
        assert!(frontier.has_pending());
        assert_eq!(frontier.advance(), Some(10));
        frontier.push(12);
        assert_eq!(frontier.advance(), Some(11));
        assert_eq!(frontier.advance(), Some(12));
        assert_eq!(frontier.advance(), None);
        assert!(!frontier.has_pending());
        assert!(frontier.cursor() <= frontier.len());
    }

    #[test]
    fn test_undrawn_entries_handed_out_once() {
        let mut frontier = Frontier::with_capacity(3);
        frontier.push('a');
        frontier.push('b');
        assert_eq!(frontier.take_undrawn(), &['a', 'b']);
        frontier.push('c');
        assert_eq!(frontier.take_undrawn(), &['c']);
        assert!(frontier.take_undrawn().is_empty());
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut frontier = Frontier::with_capacity(2);
        frontier.push(1u32);
        frontier.advance();
        frontier.clear();
        assert!(frontier.is_empty());
        assert_eq!(frontier.cursor(), 0);
        assert_eq!(frontier.capacity(), 2);
        assert!(!frontier.is_full());
    }

    #[test]
    #[should_panic(expected = "frontier overflow")]
    #[cfg(debug_assertions)]
    fn test_overflow_asserts_in_debug() {
        let mut frontier = Frontier::with_capacity(1);
        frontier.push(1u8);
        frontier.push(2u8);
    }
}
