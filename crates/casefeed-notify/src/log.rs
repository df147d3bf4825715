use std::collections::VecDeque;

use casefeed_core::{NotificationId, NotificationRecord};

/// Default number of records kept.
pub const DEFAULT_CAPACITY: usize = 100;

/// Bounded, newest-first notification log.
///
/// Inserts go to the head; once full, the tail (oldest) record is evicted.
#[derive(Clone, Debug)]
pub struct NotificationLog {
    capacity: usize,
    records: VecDeque<NotificationRecord>,
}

impl Default for NotificationLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl NotificationLog {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Insert at the head. Returns the evicted record, if any.
    pub fn push(&mut self, record: NotificationRecord) -> Option<NotificationRecord> {
        self.records.push_front(record);
        if self.records.len() > self.capacity {
            self.records.pop_back()
        } else {
            None
        }
    }

    pub fn get(&self, id: &NotificationId) -> Option<&NotificationRecord> {
        self.records.iter().find(|r| r.id == *id)
    }

    /// Flip one record to read. `false` if no record has this id.
    ///
    /// Server ids are not deduplicated, so a redelivered event can appear
    /// twice; only the newest copy is touched.
    pub fn mark_as_read(&mut self, id: &NotificationId) -> bool {
        self.set_read(id, true)
    }

    pub fn mark_as_unread(&mut self, id: &NotificationId) -> bool {
        self.set_read(id, false)
    }

    fn set_read(&mut self, id: &NotificationId, read: bool) -> bool {
        match self.records.iter_mut().find(|r| r.id == *id) {
            Some(record) => {
                record.read = read;
                true
            }
            None => false,
        }
    }

    /// Returns how many records changed.
    pub fn mark_all_as_read(&mut self) -> usize {
        let mut changed = 0;
        for record in self.records.iter_mut().filter(|r| !r.read) {
            record.read = true;
            changed += 1;
        }
        changed
    }

    pub fn remove(&mut self, id: &NotificationId) -> Option<NotificationRecord> {
        let index = self.records.iter().position(|r| r.id == *id)?;
        self.records.remove(index)
    }

    pub fn clear_all(&mut self) {
        self.records.clear();
    }

    pub fn unread_count(&self) -> usize {
        self.records.iter().filter(|r| !r.read).count()
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &NotificationRecord> {
        self.records.iter()
    }

    pub fn snapshot(&self) -> Vec<NotificationRecord> {
        self.records.iter().cloned().collect()
    }
}
