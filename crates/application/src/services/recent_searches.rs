//! Bounded recent-search history

use std::collections::VecDeque;

/// Default number of remembered queries
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Most-recent-first list of distinct queries
#[derive(Debug, Clone)]
pub struct RecentSearches {
    entries: VecDeque<String>,
    capacity: usize,
}

impl RecentSearches {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record a query, moving an exact duplicate to the front
    ///
    /// Blank queries are ignored.
    pub fn record(&mut self, query: &str) {
        if query.trim().is_empty() || self.capacity == 0 {
            return;
        }
        self.entries.retain(|q| q != query);
        self.entries.push_front(query.to_string());
        self.entries.truncate(self.capacity);
    }

    /// Queries, most recent first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RecentSearches {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}
