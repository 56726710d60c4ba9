//! Paginated collections and duplicate-free merging.
//!
//! The API paginates every list endpoint as `{ count, next, previous,
//! results }` with opaque URL cursors. `Page` keeps the fetched window of a
//! collection plus the cursor to extend it; `merge` appends the next window
//! while holding the no-duplicate-ids invariant.

use serde::{Deserialize, Serialize};

/// Entities that can live in a paginated collection, unique by id.
pub trait PageItem {
    fn item_id(&self) -> i64;
}

/// One fetched window of a paginated list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            count: None,
            next: None,
            previous: None,
            results: Vec::new(),
        }
    }
}

impl<T: PageItem> Page<T> {
    /// Whether a further page can be fetched.
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }

    fn contains(&self, id: i64) -> bool {
        self.results.iter().any(|existing| existing.item_id() == id)
    }

    /// Append a fetched page, skipping items already present.
    ///
    /// Existing items keep their positions; new items arrive in
    /// server-returned order. The cursor always advances to the fetched
    /// page's, even when every fetched item was a duplicate. Linear scan per
    /// item is fine at API page sizes.
    pub fn merge(&mut self, fetched: Page<T>) {
        for item in fetched.results {
            if !self.contains(item.item_id()) {
                self.results.push(item);
            }
        }
        self.next = fetched.next;
        self.count = fetched.count.or(self.count);
    }

    /// Drop one item by id, adjusting the reported count. Returns whether
    /// anything was removed.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.results.len();
        self.results.retain(|item| item.item_id() != id);
        let removed = self.results.len() < before;
        if removed {
            if let Some(count) = self.count.as_mut() {
                *count -= 1;
            }
        }
        removed
    }
}
