//! Page and paged-list snapshots.
//!
//! A [`PagedList`] is what a loader hands to its consumer: the prefix of the
//! local ordering that has been loaded so far, cut into fixed-capacity
//! [`Page`]s. Snapshots are immutable; every change in the underlying store
//! produces a new snapshot that supersedes the previous one.

use std::sync::Arc;

/// A bounded, ordered batch of items delivered as a unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    index: usize,
    items: Arc<[T]>,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(index: usize, items: Vec<T>) -> Self {
        Self {
            index,
            items: items.into(),
        }
    }

    /// Zero-based position of this page within its list.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Snapshot of the loaded prefix of a paged collection.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedList<T> {
    pages: Vec<Page<T>>,
    page_size: usize,
    total_count: usize,
}

impl<T> PagedList<T> {
    /// An empty snapshot ("no data yet").
    #[must_use]
    pub fn empty(page_size: usize) -> Self {
        Self {
            pages: Vec::new(),
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    /// Cut `items` into pages of `page_size`.
    ///
    /// `total_count` is the number of items the source held when `items` was
    /// read; it may exceed `items.len()` when only a prefix was loaded.
    #[must_use]
    pub fn from_items(items: Vec<T>, page_size: usize, total_count: usize) -> Self {
        let page_size = page_size.max(1);
        let total_count = total_count.max(items.len());
        let mut pages = Vec::with_capacity(items.len().div_ceil(page_size));
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            let chunk: Vec<T> = items.by_ref().take(page_size).collect();
            pages.push(Page::new(pages.len(), chunk));
        }
        Self {
            pages,
            page_size,
            total_count,
        }
    }

    #[must_use]
    pub fn pages(&self) -> &[Page<T>] {
        &self.pages
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    /// Items present in the source at read time, loaded or not.
    #[must_use]
    pub const fn total_count(&self) -> usize {
        self.total_count
    }

    /// Number of loaded items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages.iter().map(Page::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pages.iter().all(Page::is_empty)
    }

    /// Whether the source holds items beyond the loaded prefix.
    #[must_use]
    pub fn has_unloaded(&self) -> bool {
        self.len() < self.total_count
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        let page = self.pages.get(index / self.page_size)?;
        page.items().get(index % self.page_size)
    }

    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.pages.first().and_then(|page| page.items().first())
    }

    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.pages.last().and_then(|page| page.items().last())
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.items().iter())
    }
}
