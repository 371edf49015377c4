//! Cross-feed de-duplication by article link.

use std::collections::HashSet;

/// Remembers every link admitted during one run.
///
/// The first article to present a link wins; every later one is rejected no
/// matter which category or source it comes from.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` and records `link` the first time it is seen.
    pub fn admit(&mut self, link: &str) -> bool {
        if self.seen.contains(link) {
            return false;
        }
        self.seen.insert(link.to_string())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}
