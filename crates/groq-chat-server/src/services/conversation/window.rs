use std::collections::VecDeque;

use super::types::{Turn, WindowCapacity};

/// Rolling buffer of conversation turns, oldest first.
///
/// A bounded window never holds more than its capacity; appending past it
/// drops turns from the front.
#[derive(Debug, Clone)]
pub struct MemoryWindow {
    turns: VecDeque<Turn>,
    capacity: WindowCapacity,
}

impl MemoryWindow {
    /// Storage grows with the turns actually appended, not with the capacity.
    pub fn new(capacity: WindowCapacity) -> Self {
        Self {
            turns: VecDeque::new(),
            capacity,
        }
    }

    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);

        if let Some(limit) = self.capacity.limit() {
            while self.turns.len() > limit {
                self.turns.pop_front();
            }
        }
    }

    /// Turns in conversational order. The iterator borrows the window and can
    /// be cloned to walk the history again.
    pub fn render_context(&self) -> impl ExactSizeIterator<Item = &Turn> + Clone + '_ {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn to_vec(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn capacity(&self) -> WindowCapacity {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(i: usize) -> Turn {
        Turn::new(format!("Q{}", i), format!("A{}", i))
    }

    #[test]
    fn test_fifo_eviction_keeps_last_five() {
        let mut window = MemoryWindow::new(WindowCapacity::Bounded(5));
        for i in 1..=6 {
            window.append(turn(i));
        }

        let kept: Vec<Turn> = window.render_context().cloned().collect();
        assert_eq!(kept, (2..=6).map(turn).collect::<Vec<_>>());
    }

    #[test]
    fn test_bounded_length_never_exceeds_capacity() {
        for cap in 1..=7 {
            let mut window = MemoryWindow::new(WindowCapacity::Bounded(cap));
            for n in 1..=20 {
                window.append(turn(n));
                assert!(window.len() <= cap);

                let expected: Vec<Turn> = (n.saturating_sub(cap) + 1..=n).map(turn).collect();
                assert_eq!(window.to_vec(), expected, "cap={} after {} appends", cap, n);
            }
        }
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let mut window = MemoryWindow::new(WindowCapacity::Unbounded);
        for i in 1..=50 {
            window.append(turn(i));
        }
        assert_eq!(window.len(), 50);
        assert_eq!(window.render_context().next(), Some(&turn(1)));
        assert_eq!(window.last(), Some(&turn(50)));
    }

    #[test]
    fn test_render_context_is_repeatable() {
        let mut window = MemoryWindow::new(WindowCapacity::Bounded(3));
        window.append(turn(1));
        window.append(turn(2));

        let first: Vec<&Turn> = window.render_context().collect();
        let second: Vec<&Turn> = window.render_context().collect();
        assert_eq!(first, second);

        let iter = window.render_context();
        let replay = iter.clone();
        assert_eq!(iter.count(), 2);
        assert_eq!(replay.len(), 2);
    }

    #[test]
    fn test_empty_window() {
        let window = MemoryWindow::new(WindowCapacity::Bounded(5));
        assert!(window.is_empty());
        assert_eq!(window.render_context().count(), 0);
        assert!(window.last().is_none());
        assert_eq!(window.capacity(), WindowCapacity::Bounded(5));
    }

    #[test]
    fn test_large_capacity_allocates_lazily() {
        let mut window = MemoryWindow::new(WindowCapacity::Bounded(usize::MAX));
        assert_eq!(window.turns.capacity(), 0);

        window.append(turn(1));
        window.append(turn(2));
        assert_eq!(window.len(), 2);
        assert!(window.turns.capacity() < 1024);
    }
}
