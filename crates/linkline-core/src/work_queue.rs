//! Claim-once queue shared by download workers

use std::sync::atomic::{AtomicUsize, Ordering};

/// Items handed out at most once, in order, to any number of workers.
///
/// A worker that stops early (cancellation) simply stops calling
/// [`next`](WorkQueue::next); whatever is left shows up in
/// [`unclaimed`](WorkQueue::unclaimed).
#[derive(Debug)]
pub struct WorkQueue<T> {
    items: Vec<T>,
    claimed: AtomicUsize,
}

impl<T> WorkQueue<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            claimed: AtomicUsize::new(0),
        }
    }

    /// Claim the next item, `None` once the queue is drained.
    pub fn next(&self) -> Option<&T> {
        self.items.get(self.claimed.fetch_add(1, Ordering::Relaxed))
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// Items nobody claimed.
    pub fn unclaimed(&self) -> &[T] {
        let start = self.claimed.load(Ordering::Relaxed).min(self.items.len());
        &self.items[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_each_item_once() {
        let queue = WorkQueue::new(vec!["a", "b"]);
        assert_eq!(queue.total(), 2);
        assert_eq!(queue.next(), Some(&"a"));
        assert_eq!(queue.next(), Some(&"b"));
        assert_eq!(queue.next(), None);
        assert_eq!(queue.next(), None);
        assert!(queue.unclaimed().is_empty());
    }

    #[test]
    fn unclaimed_after_early_stop() {
        let queue = WorkQueue::new(vec![1, 2, 3]);
        assert_eq!(queue.unclaimed(), &[1, 2, 3]);
        queue.next();
        assert_eq!(queue.unclaimed(), &[2, 3]);
    }

    #[test]
    fn concurrent_claims_are_disjoint() {
        let queue = WorkQueue::new((0..1000).collect::<Vec<u32>>());
        let seen = std::sync::Mutex::new(Vec::new());
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    while let Some(&n) = queue.next() {
                        seen.lock().unwrap().push(n);
                    }
                });
            }
        });
        let mut seen = seen.into_inner().unwrap();
        seen.sort_unstable();
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
    }
}
