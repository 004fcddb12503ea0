//! Utility types.

use std::{collections::VecDeque, hash::Hash};

type BuildHasher = std::hash::BuildHasherDefault<rustc_hash::FxHasher>;

/// Insertion-order preserving map. Iteration order must stay deterministic
/// so that the generated automaton is reproducible run-to-run.
pub type Map<K, V> = indexmap::IndexMap<K, V, BuildHasher>;

/// Insertion-order preserving set.
pub type Set<T> = indexmap::IndexSet<T, BuildHasher>;

/// A FIFO worklist that ignores re-insertion of enqueued values.
#[derive(Debug)]
pub struct Queue<T> {
    queue: VecDeque<T>,
    seen: Set<T>,
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            seen: Set::default(),
        }
    }
}

impl<T> Queue<T>
where
    T: Copy + Eq + Hash,
{
    pub fn push(&mut self, value: T) -> bool {
        let fresh = self.seen.insert(value);
        if fresh {
            self.queue.push_back(value);
        }
        fresh
    }

    pub fn pop(&mut self) -> Option<T> {
        let value = self.queue.pop_front()?;
        self.seen.remove(&value);
        Some(value)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl<T> FromIterator<T> for Queue<T>
where
    T: Copy + Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut queue = Self::default();
        for value in iter {
            queue.push(value);
        }
        queue
    }
}
