//! Tracking of tree count changes that have not been confirmed yet.
//!
//! When an ingest notification says a group gained items, the exact count is
//! unknown until the group is queried again. The tracker keeps such events
//! so that count queries can report the affected nodes as indeterminate.
//! Entries never expire on their own; they are removed by
//! [`PendingCountTracker::resolve`] or [`PendingCountTracker::flush`].

use dashmap::DashSet;
use std::hash::Hash;

/// Concurrent set of pending change events.
#[derive(Debug)]
pub struct PendingCountTracker<T: Eq + Hash> {
    enqueued: DashSet<T>,
}

impl<T: Eq + Hash + Clone> PendingCountTracker<T> {
    pub fn new() -> Self {
        Self {
            enqueued: DashSet::new(),
        }
    }

    /// Mark events as pending and return only those that were not pending
    /// already.
    pub fn enqueue_all<I>(&self, events: I) -> Vec<T>
    where
        I: IntoIterator<Item = T>,
    {
        events
            .into_iter()
            .filter(|event| self.enqueued.insert(event.clone()))
            .collect()
    }

    /// Snapshot of the events currently pending.
    pub fn get_enqueued(&self) -> Vec<T> {
        self.enqueued.iter().map(|event| event.key().clone()).collect()
    }

    pub fn is_enqueued(&self, event: &T) -> bool {
        self.enqueued.contains(event)
    }

    /// Clear the given events, returning those that were actually pending.
    pub fn resolve<'a, I>(&self, events: I) -> Vec<T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        events
            .into_iter()
            .filter_map(|event| self.enqueued.remove(event))
            .collect()
    }

    /// Clear and return everything pending.
    pub fn flush(&self) -> Vec<T> {
        let snapshot = self.get_enqueued();
        self.resolve(snapshot.iter())
    }

    pub fn len(&self) -> usize {
        self.enqueued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enqueued.is_empty()
    }
}

impl<T: Eq + Hash + Clone> Default for PendingCountTracker<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_reports_only_new_events() {
        let tracker = PendingCountTracker::new();

        let added = tracker.enqueue_all(vec![(1, "bob", "Inbox"), (1, "bob", "Sent")]);
        assert_eq!(added.len(), 2);

        let added = tracker.enqueue_all(vec![(1, "bob", "Inbox"), (2, "bob", "Inbox")]);
        assert_eq!(added, vec![(2, "bob", "Inbox")]);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn duplicates_within_one_batch_are_reported_once() {
        let tracker = PendingCountTracker::new();
        let added = tracker.enqueue_all(vec![(1, "bob", "Inbox"), (1, "bob", "Inbox")]);
        assert_eq!(added, vec![(1, "bob", "Inbox")]);
    }

    #[test]
    fn pending_events_stay_until_resolved() {
        let tracker = PendingCountTracker::new();
        tracker.enqueue_all(vec![(1, "bob", "Inbox"), (1, "bob", "Sent")]);

        let resolved = tracker.resolve(&[(1, "bob", "Inbox"), (1, "alice", "Inbox")]);
        assert_eq!(resolved, vec![(1, "bob", "Inbox")]);
        assert!(!tracker.is_enqueued(&(1, "bob", "Inbox")));
        assert!(tracker.is_enqueued(&(1, "bob", "Sent")));

        // once resolved the same change is new again
        assert_eq!(tracker.enqueue_all(vec![(1, "bob", "Inbox")]).len(), 1);
    }

    #[test]
    fn flush_empties_the_tracker() {
        let tracker = PendingCountTracker::new();
        tracker.enqueue_all(vec![(1, "bob", "Inbox"), (2, "bob", "Inbox")]);

        let mut flushed = tracker.flush();
        flushed.sort();
        assert_eq!(flushed, vec![(1, "bob", "Inbox"), (2, "bob", "Inbox")]);
        assert!(tracker.is_empty());
        assert!(tracker.flush().is_empty());
    }

    #[test]
    fn concurrent_enqueue_adds_each_event_once() {
        let tracker = PendingCountTracker::new();

        let added: usize = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| tracker.enqueue_all(vec![(1, "bob", "Inbox")]).len()))
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().expect("thread completes"))
                .sum()
        });

        assert_eq!(added, 1);
        assert_eq!(tracker.get_enqueued(), vec![(1, "bob", "Inbox")]);
    }
}
