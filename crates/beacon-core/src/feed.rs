//! Bounded notification feed
//!
//! Pure state. The list is kept newest first, holds at most one entry per id
//! and never grows past its capacity.

use beacon_model::{retain_newest, unread_count, NotificationId, NotificationItem, MAX_RETAINED};
use chrono::{DateTime, Utc};

/// Result of [`NotificationFeed::push`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushOutcome {
    /// An entry with the same id was replaced
    pub replaced: bool,
    /// Ids dropped to stay within capacity
    pub evicted: Vec<NotificationId>,
}

/// Ordered, deduplicated, bounded notification list
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationFeed {
    items: Vec<NotificationItem>,
    capacity: usize,
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationFeed {
    /// Empty feed holding up to [`MAX_RETAINED`] entries
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(MAX_RETAINED)
    }

    /// Empty feed with a custom bound (at least 1)
    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Feed from an arbitrary list
    #[must_use]
    pub fn from_items(items: Vec<NotificationItem>) -> Self {
        let mut feed = Self::new();
        feed.items = items;
        retain_newest(&mut feed.items, feed.capacity);
        feed
    }

    /// Insert or replace `item`
    ///
    /// Any entry with the same id is removed first, so the latest delivery
    /// wins. If the bound is exceeded the oldest entries go, which can be
    /// `item` itself.
    pub fn push(&mut self, item: NotificationItem) -> PushOutcome {
        let before = self.items.len();
        let id = item.id;
        self.items.retain(|existing| existing.id != id);
        let replaced = self.items.len() != before;

        self.items.insert(0, item);
        self.items.sort_by(NotificationItem::newest_first);

        let evicted = if self.items.len() > self.capacity {
            self.items
                .drain(self.capacity..)
                .map(|dropped| dropped.id)
                .collect()
        } else {
            Vec::new()
        };

        PushOutcome { replaced, evicted }
    }

    /// Mark one entry read
    ///
    /// Returns `false` if the id is absent or already read.
    pub fn mark_as_read(&mut self, id: NotificationId, now: DateTime<Utc>) -> bool {
        self.items
            .iter_mut()
            .find(|item| item.id == id)
            .is_some_and(|item| item.mark_read(now))
    }

    /// Mark every unread entry read, returning how many flipped
    pub fn mark_all_as_read(&mut self, now: DateTime<Utc>) -> usize {
        self.items
            .iter_mut()
            .map(|item| item.mark_read(now))
            .filter(|flipped| *flipped)
            .count()
    }

    /// Remove everything, returning how many entries were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.items.len();
        self.items.clear();
        count
    }

    #[inline]
    #[must_use]
    pub fn unread_count(&self) -> usize {
        unread_count(&self.items)
    }

    #[inline]
    #[must_use]
    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&NotificationItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn item(id: i64, secs: i64) -> NotificationItem {
        NotificationItem::new(id, format!("n{id}"), at(secs))
    }

    fn ids(feed: &NotificationFeed) -> Vec<i64> {
        feed.items().iter().map(|item| item.id.0).collect()
    }

    #[test]
    fn push_keeps_newest_first() {
        let mut feed = NotificationFeed::new();
        feed.push(item(1, 10));
        feed.push(item(2, 30));
        feed.push(item(3, 20));

        assert_eq!(ids(&feed), vec![2, 3, 1]);
        assert_eq!(feed.unread_count(), 3);
    }

    #[test]
    fn push_replaces_same_id() {
        let mut feed = NotificationFeed::from_items(vec![item(1, 10), item(2, 20)]);

        let outcome = feed.push(item(1, 10).with_message("updated"));

        assert!(outcome.replaced);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.get(NotificationId(1)).unwrap().message.as_deref(), Some("updated"));
    }

    #[test]
    fn replacement_can_carry_read_state() {
        let mut feed = NotificationFeed::from_items(vec![item(1, 10)]);
        feed.push(item(1, 10).read(at(50)));

        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn push_evicts_oldest_past_capacity() {
        let mut feed = NotificationFeed::from_items((1..=50).map(|id| item(id, id)).collect());
        assert_eq!(feed.len(), 50);

        let outcome = feed.push(item(51, 51));

        assert_eq!(outcome.evicted, vec![NotificationId(1)]);
        assert_eq!(feed.len(), 50);
        assert_eq!(ids(&feed)[0], 51);
        assert!(feed.get(NotificationId(1)).is_none());
    }

    #[test]
    fn stale_push_into_full_feed_is_evicted_itself() {
        let mut feed = NotificationFeed::with_capacity(2);
        feed.push(item(1, 10));
        feed.push(item(2, 20));

        let outcome = feed.push(item(3, 0));

        assert_eq!(outcome.evicted, vec![NotificationId(3)]);
        assert_eq!(ids(&feed), vec![2, 1]);
    }

    #[test]
    fn mark_as_read_is_idempotent() {
        let mut feed = NotificationFeed::from_items(vec![item(1, 10)]);

        assert!(feed.mark_as_read(NotificationId(1), at(100)));
        assert!(!feed.mark_as_read(NotificationId(1), at(200)));
        assert!(!feed.mark_as_read(NotificationId(99), at(200)));

        let read = feed.get(NotificationId(1)).unwrap();
        assert!(read.is_read);
        assert_eq!(read.read_at, Some(at(100)));
    }

    #[test]
    fn mark_all_counts_only_flips() {
        let mut feed = NotificationFeed::from_items(vec![item(1, 1), item(2, 2).read(at(5)), item(3, 3)]);

        assert_eq!(feed.mark_all_as_read(at(10)), 2);
        assert_eq!(feed.unread_count(), 0);
        assert_eq!(feed.mark_all_as_read(at(20)), 0);
        assert_eq!(feed.get(NotificationId(2)).unwrap().read_at, Some(at(5)));
    }

    #[test]
    fn clear_empties() {
        let mut feed = NotificationFeed::from_items(vec![item(1, 1), item(2, 2)]);
        assert_eq!(feed.clear(), 2);
        assert!(feed.is_empty());
        assert_eq!(feed.unread_count(), 0);
    }

    #[test]
    fn from_items_dedups_and_bounds() {
        let mut items: Vec<_> = (1..=60).map(|id| item(id, id)).collect();
        items.push(item(60, 60));

        let feed = NotificationFeed::from_items(items);

        assert_eq!(feed.len(), MAX_RETAINED);
        assert_eq!(ids(&feed)[0], 60);
        assert_eq!(ids(&feed)[49], 11);
    }
}
