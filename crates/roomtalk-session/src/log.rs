//! Append-only message log.

use roomtalk_types::ChatEntry;

/// Ordered, append-only sequence of chat entries.
///
/// Insertion order is time order: an entry whose clock reading is earlier
/// than the last entry's is restamped with the last entry's timestamp.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<ChatEntry>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry to the end of the log.
    pub fn append(&mut self, mut entry: ChatEntry) -> &ChatEntry {
        if let Some(last) = self.entries.last() {
            if entry.timestamp < last.timestamp {
                entry.timestamp = last.timestamp;
            }
        }
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Drop every entry. Only an explicit leave does this.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
