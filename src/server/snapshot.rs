//! Point-in-time page list shared between the refresh task and the index view

use std::sync::{Arc, RwLock};

use crate::content::Page;

/// The latest loaded page list, swapped as a whole on refresh
#[derive(Debug, Default)]
pub struct Snapshot {
    pages: RwLock<Arc<Vec<Page>>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current page list. The lock is released before the caller uses it.
    pub fn get(&self) -> Arc<Vec<Page>> {
        self.pages
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the page list
    pub fn replace(&self, pages: Vec<Page>) {
        let pages = Arc::new(pages);
        *self
            .pages
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = pages;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_old_readers_valid() {
        let snapshot = Snapshot::new();
        assert!(snapshot.get().is_empty());

        let before = snapshot.get();
        snapshot.replace(vec![Page::default(), Page::default()]);

        assert!(before.is_empty());
        assert_eq!(snapshot.get().len(), 2);
    }
}
