use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub term: u64,
    pub command: Vec<u8>,
}

/// In-memory append-only log.
///
/// Replication is handled by an external layer; within this crate the log
/// only sizes the leader's `next_index` trackers and supplies the
/// last-position fields carried by outgoing RPCs.
pub struct Log {
    entries: Vec<LogEntry>,
}

impl Log {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the last entry, counting from 1; 0 means the log is empty.
    pub fn last_index(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn last_term(&self) -> u64 {
        self.entries.last().map(|e| e.term).unwrap_or(0)
    }

    pub fn append(&mut self, entry: LogEntry) -> u64 {
        self.entries.push(entry);
        self.entries.len() as u64
    }
}

impl Default for Log {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_log_has_zero_positions() {
        let log = Log::new();
        assert!(log.is_empty());
        assert_eq!(log.last_index(), 0);
        assert_eq!(log.last_term(), 0);
    }

    #[test]
    fn append_advances_last_index_and_term() {
        let mut log = Log::new();

        let idx = log.append(LogEntry {
            term: 1,
            command: Vec::new(),
        });
        assert_eq!(idx, 1);

        let idx = log.append(LogEntry {
            term: 3,
            command: Vec::new(),
        });
        assert_eq!(idx, 2);

        assert_eq!(log.len(), 2);
        assert_eq!(log.last_index(), 2);
        assert_eq!(log.last_term(), 3);
    }
}
