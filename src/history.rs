use crate::ports::notify::LocalNotifier;
use crate::ports::store::KeyValueStore;
use crate::types::history::NotificationRecord;

pub(crate) const HISTORY_KEY: &str = "notificationHistory";

/// Bounded, newest-first notification history persisted as one JSON array.
/// Storage and badge failures never reach the caller; the dispatch
/// pipeline must keep running with history degraded.
#[derive(Clone)]
pub struct HistoryStore<K, L> {
    store: K,
    notifier: L,
    limit: usize,
}

impl<K, L> HistoryStore<K, L>
where
    K: KeyValueStore,
    L: LocalNotifier,
{
    pub fn new(store: K, notifier: L, limit: usize) -> Self {
        Self {
            store,
            notifier,
            limit,
        }
    }

    /// The full stored sequence, newest first. Absent or corrupt storage
    /// reads as empty history.
    pub fn list(&self) -> Vec<NotificationRecord> {
        let raw = match self.store.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!("notification history read failed: {err}");
                return Vec::new();
            }
        };
        match serde_json::from_str(&raw) {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!("notification history unreadable, treating as empty: {err}");
                Vec::new()
            }
        }
    }

    pub fn append(&self, record: NotificationRecord) {
        let mut records = self.list();
        records.insert(0, record);
        records.truncate(self.limit);
        self.write(&records);
        self.publish_unread_count(&records);
    }

    /// No-op when the id is unknown; a tap on an already-pruned entry is
    /// not an error.
    pub fn mark_read(&self, id: &str) {
        let mut records = self.list();
        let Some(record) = records.iter_mut().find(|record| record.id == id) else {
            return;
        };
        record.read = true;
        self.write(&records);
        self.publish_unread_count(&records);
    }

    pub fn clear(&self) {
        if let Err(err) = self.store.remove(HISTORY_KEY) {
            tracing::warn!("notification history clear failed: {err}");
        }
        self.publish_unread_count(&[]);
    }

    pub fn unread_count(&self) -> usize {
        self.list().iter().filter(|record| !record.read).count()
    }

    fn write(&self, records: &[NotificationRecord]) {
        let raw = match serde_json::to_string(records) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("notification history encode failed: {err}");
                return;
            }
        };
        if let Err(err) = self.store.set(HISTORY_KEY, &raw) {
            tracing::warn!("notification history write failed: {err}");
        }
    }

    fn publish_unread_count(&self, records: &[NotificationRecord]) {
        let unread = records.iter().filter(|record| !record.read).count();
        if let Err(err) = self.notifier.set_badge(unread) {
            tracing::warn!("badge update failed: {err}");
        }
    }
}
