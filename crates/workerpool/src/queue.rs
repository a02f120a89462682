// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The task queue family: FIFO, LIFO, and priority variants behind one concrete type — a public
//! wrapper around a private enum rather than a trait-object hierarchy.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};

/// Initial ring-buffer capacity for a [`QueueStrategy::Fifo`] queue, chosen as a small power of
/// two.
const INITIAL_FIFO_CAPACITY: usize = 16;

/// A comparator for the priority queue variant. Returns [`Ordering::Less`] to mean "`a` has
/// higher dequeue priority than `b`", the usual "negative means `a` first" convention.
pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Anything that can be placed in a [`TaskQueue`] and has a default priority for the
/// [`QueueStrategy::Priority`] variant when no custom comparator is supplied.
pub trait Prioritized {
    /// Lower values dequeue earlier under the default (no custom comparator) ordering.
    fn priority(&self) -> i64 {
        0
    }
}

/// Which queue discipline a [`TaskQueue`] implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueueStrategy {
    /// First in, first out.
    #[default]
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Binary-heap ordered by [`Prioritized::priority`] (or a custom comparator), min-heap
    /// convention: lower numbers dequeue first.
    Priority,
}

enum Kind<T> {
    Fifo(VecDeque<T>),
    Lifo(Vec<T>),
    Priority {
        heap: BinaryHeap<Entry<T>>,
        comparator: Option<Comparator<T>>,
        next_seq: AtomicU64,
    },
}

/// An ordered container of pending tasks. FIFO by default; see [`QueueStrategy`] for the other
/// variants. All variants expose the identical surface below so the [`Pool`][pool] stays
/// agnostic to which one is in use.
///
/// [pool]: crate::Pool
pub struct TaskQueue<T: Prioritized> {
    kind: Kind<T>,
}

impl<T: Prioritized> TaskQueue<T> {
    /// Creates a FIFO queue backed by a ring buffer with amortized O(1) push/pop.
    #[must_use]
    pub fn fifo() -> Self {
        Self {
            kind: Kind::Fifo(VecDeque::with_capacity(INITIAL_FIFO_CAPACITY)),
        }
    }

    /// Creates a LIFO queue backed by a growable array.
    #[must_use]
    pub fn lifo() -> Self {
        Self { kind: Kind::Lifo(Vec::new()) }
    }

    /// Creates a priority queue using [`Prioritized::priority`] as the default ordering.
    #[must_use]
    pub fn priority() -> Self {
        Self {
            kind: Kind::Priority {
                heap: BinaryHeap::new(),
                comparator: None,
                next_seq: AtomicU64::new(0),
            },
        }
    }

    /// Creates a priority queue using a custom comparator instead of [`Prioritized::priority`].
    #[must_use]
    pub fn priority_with(comparator: impl Fn(&T, &T) -> Ordering + Send + Sync + 'static) -> Self {
        Self {
            kind: Kind::Priority {
                heap: BinaryHeap::new(),
                comparator: Some(Arc::new(comparator)),
                next_seq: AtomicU64::new(0),
            },
        }
    }

    /// Builds the queue variant named by `strategy`, with no custom comparator.
    #[must_use]
    pub fn with_strategy(strategy: QueueStrategy) -> Self {
        match strategy {
            QueueStrategy::Fifo => Self::fifo(),
            QueueStrategy::Lifo => Self::lifo(),
            QueueStrategy::Priority => Self::priority(),
        }
    }

    /// Appends `item` in dequeue order for the queue's discipline.
    pub fn push(&mut self, item: T) {
        match &mut self.kind {
            Kind::Fifo(deque) => deque.push_back(item),
            Kind::Lifo(stack) => stack.push(item),
            Kind::Priority { heap, comparator, next_seq } => {
                let seq = next_seq.fetch_add(1, AtomicOrdering::Relaxed);
                heap.push(Entry { item, seq, comparator: comparator.clone() });
            }
        }
    }

    /// Removes and returns the next item in dequeue order, or `None` if the queue is empty.
    pub fn pop(&mut self) -> Option<T> {
        match &mut self.kind {
            Kind::Fifo(deque) => deque.pop_front(),
            Kind::Lifo(stack) => stack.pop(),
            Kind::Priority { heap, .. } => heap.pop().map(|entry| entry.item),
        }
    }

    /// The number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.kind {
            Kind::Fifo(deque) => deque.len(),
            Kind::Lifo(stack) => stack.len(),
            Kind::Priority { heap, .. } => heap.len(),
        }
    }

    /// Whether the queue holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any queued item matches `pred`. O(n) for every variant.
    pub fn contains(&self, mut pred: impl FnMut(&T) -> bool) -> bool {
        match &self.kind {
            Kind::Fifo(deque) => deque.iter().any(|item| pred(item)),
            Kind::Lifo(stack) => stack.iter().any(|item| pred(item)),
            Kind::Priority { heap, .. } => heap.iter().any(|entry| pred(&entry.item)),
        }
    }

    /// Removes and returns the first queued item matching `pred`, preserving the relative order
    /// of the remaining items. Used to drop a task from the queue when it is cancelled before
    /// dispatch.
    pub fn remove_first(&mut self, mut pred: impl FnMut(&T) -> bool) -> Option<T> {
        match &mut self.kind {
            Kind::Fifo(deque) => {
                let index = deque.iter().position(|item| pred(item))?;
                deque.remove(index)
            }
            Kind::Lifo(stack) => {
                let index = stack.iter().position(|item| pred(item))?;
                Some(stack.remove(index))
            }
            Kind::Priority { heap, comparator, .. } => {
                let mut rest = Vec::with_capacity(heap.len());
                let mut found = None;
                for entry in heap.drain() {
                    if found.is_none() && pred(&entry.item) {
                        found = Some(entry.item);
                    } else {
                        rest.push(entry);
                    }
                }
                *heap = rest.into_iter().collect();
                let _ = comparator;
                found
            }
        }
    }

    /// Removes every queued item, returning them in no particular order, and resets the queue
    /// to empty.
    pub fn clear(&mut self) -> Vec<T> {
        match &mut self.kind {
            Kind::Fifo(deque) => deque.drain(..).collect(),
            Kind::Lifo(stack) => std::mem::take(stack),
            Kind::Priority { heap, .. } => heap.drain().map(|entry| entry.item).collect(),
        }
    }
}

impl<T: Prioritized> fmt::Debug for TaskQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match &self.kind {
            Kind::Fifo(_) => "Fifo",
            Kind::Lifo(_) => "Lifo",
            Kind::Priority { .. } => "Priority",
        };
        f.debug_struct("TaskQueue")
            .field("strategy", &strategy)
            .field("len", &self.len())
            .finish()
    }
}

struct Entry<T> {
    item: T,
    seq: u64,
    comparator: Option<Comparator<T>>,
}

impl<T: Prioritized> PartialEq for Entry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<T: Prioritized> Eq for Entry<T> {}

impl<T: Prioritized> PartialOrd for Entry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: Prioritized> Ord for Entry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // `BinaryHeap` is a max-heap, so "dequeues first" must compare as "greater".
        let primary = self.comparator.as_ref().map_or_else(
            || other.item.priority().cmp(&self.item.priority()),
            |comparator| comparator(&self.item, &other.item).reverse(),
        );
        // Tie-break is unspecified by contract; insertion order keeps it deterministic for tests.
        primary.then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    // Raw primitives used by the FIFO/LIFO tests below don't carry a meaningful priority; the
    // default `priority()` (0) is fine since those strategies never consult it.
    impl Prioritized for i32 {}
    impl Prioritized for &str {}

    #[derive(Debug, PartialEq, Eq, Clone)]
    struct Item {
        label: &'static str,
        priority: i64,
    }

    impl Prioritized for Item {
        fn priority(&self) -> i64 {
            self.priority
        }
    }

    #[rstest]
    #[case::fifo(QueueStrategy::Fifo)]
    #[case::lifo(QueueStrategy::Lifo)]
    #[case::priority(QueueStrategy::Priority)]
    fn every_strategy_reports_accurate_len_and_emptiness(#[case] strategy: QueueStrategy) {
        let mut q: TaskQueue<i32> = TaskQueue::with_strategy(strategy);
        assert!(q.is_empty());

        q.push(1);
        q.push(2);
        assert_eq!(q.len(), 2);
        assert!(!q.is_empty());

        assert!(q.pop().is_some());
        assert!(q.pop().is_some());
        assert!(q.is_empty());
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn fifo_dequeues_in_push_order() {
        let mut q = TaskQueue::fifo();
        q.push(1);
        q.push(2);
        q.push(3);

        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn fifo_grows_past_initial_capacity() {
        let mut q = TaskQueue::fifo();
        for i in 0..(INITIAL_FIFO_CAPACITY * 4) {
            q.push(i);
        }
        for i in 0..(INITIAL_FIFO_CAPACITY * 4) {
            assert_eq!(q.pop(), Some(i));
        }
    }

    #[test]
    fn lifo_dequeues_in_reverse_push_order() {
        let mut q = TaskQueue::lifo();
        q.push(1);
        q.push(2);
        q.push(3);

        assert_eq!(q.pop(), Some(3));
        assert_eq!(q.pop(), Some(2));
        assert_eq!(q.pop(), Some(1));
    }

    #[test]
    fn priority_dequeues_lowest_number_first() {
        let mut q = TaskQueue::priority();
        q.push(Item { label: "b", priority: 5 });
        q.push(Item { label: "a", priority: 1 });
        q.push(Item { label: "c", priority: 10 });

        assert_eq!(q.pop().unwrap().label, "a");
        assert_eq!(q.pop().unwrap().label, "b");
        assert_eq!(q.pop().unwrap().label, "c");
    }

    #[test]
    fn priority_with_custom_comparator_higher_dequeues_first() {
        // Custom comparator: higher number means higher dequeue priority (opposite of default).
        let mut q = TaskQueue::priority_with(|a: &Item, b: &Item| b.priority.cmp(&a.priority));
        q.push(Item { label: "low", priority: 1 });
        q.push(Item { label: "high", priority: 10 });

        assert_eq!(q.pop().unwrap().label, "high");
        assert_eq!(q.pop().unwrap().label, "low");
    }

    #[test]
    fn contains_and_remove_first() {
        let mut q = TaskQueue::fifo();
        q.push("a");
        q.push("b");
        q.push("c");

        assert!(q.contains(|item| *item == "b"));
        assert_eq!(q.remove_first(|item| *item == "b"), Some("b"));
        assert!(!q.contains(|item| *item == "b"));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn clear_empties_the_queue() {
        let mut q = TaskQueue::lifo();
        q.push(1);
        q.push(2);

        let drained = q.clear();
        assert_eq!(drained.len(), 2);
        assert!(q.is_empty());
    }
}
