//! Infinite-scroll accumulation of server pages for one filter at a time.

use super::CacheItem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub has_more: bool,
    pub total: Option<u32>,
    pub found: Option<u32>,
}

impl<T> FeedPage<T> {
    pub fn new(items: Vec<T>, page: u32, has_more: bool) -> Self {
        Self {
            items,
            page,
            has_more,
            total: None,
            found: None,
        }
    }
}

/// A page fetch the caller must perform, then hand back to
/// [`FeedLoader::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub filter: String,
    pub page: u32,
    generation: u64,
}

#[derive(Debug, Clone)]
pub struct Feed<T> {
    filter: String,
    pages: Vec<FeedPage<T>>,
    revision: u64,
}

impl<T: Clone> Feed<T> {
    fn new(filter: &str) -> Self {
        Self {
            filter: filter.to_string(),
            pages: Vec::new(),
            revision: 0,
        }
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn pages(&self) -> &[FeedPage<T>] {
        &self.pages
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|p| p.items.iter())
    }

    /// No page yet counts as "more exists" so the first load can start.
    pub fn has_more(&self) -> bool {
        self.pages.last().map(|p| p.has_more).unwrap_or(true)
    }

    pub fn total(&self) -> Option<u32> {
        self.pages.first().and_then(|p| p.total)
    }

    pub fn found(&self) -> Option<u32> {
        self.pages.first().and_then(|p| p.found)
    }
}

/// Captured pages from before an optimistic removal.
#[derive(Debug, Clone)]
pub struct FeedRollback<T> {
    generation: u64,
    revision: u64,
    pages: Vec<FeedPage<T>>,
}

#[derive(Debug)]
pub struct FeedLoader<T> {
    feed: Option<Feed<T>>,
    generation: u64,
    in_flight: Option<PageRequest>,
    error: Option<String>,
    stale: bool,
}

impl<T> Default for FeedLoader<T> {
    fn default() -> Self {
        Self {
            feed: None,
            generation: 0,
            in_flight: None,
            error: None,
            stale: false,
        }
    }
}

impl<T: Clone> FeedLoader<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&self) -> Option<&Feed<T>> {
        self.feed.as_ref()
    }

    pub fn filter(&self) -> Option<&str> {
        self.feed.as_ref().map(|f| f.filter())
    }

    /// Switch to `filter`. A different filter discards every loaded page and
    /// orphans any fetch in flight. Returns whether anything changed.
    pub fn set_filter(&mut self, filter: &str) -> bool {
        if self.filter() == Some(filter) {
            return false;
        }
        self.start_feed(Some(filter.to_string()));
        true
    }

    /// Drop loaded pages for the current filter and start again at page 1.
    pub fn reset(&mut self) {
        let filter = self.filter().map(ToString::to_string);
        self.start_feed(filter);
    }

    pub fn clear(&mut self) {
        self.start_feed(None);
    }

    fn start_feed(&mut self, filter: Option<String>) {
        self.generation += 1;
        self.feed = filter.as_deref().map(Feed::new);
        self.in_flight = None;
        self.error = None;
        self.stale = false;
    }

    /// Next page to fetch, or `None` while a fetch is in flight or the last
    /// page said nothing more exists.
    pub fn load_next(&mut self) -> Option<PageRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        let feed = self.feed.as_ref()?;
        if !feed.has_more() {
            return None;
        }
        let req = PageRequest {
            filter: feed.filter.clone(),
            page: feed.pages.len() as u32 + 1,
            generation: self.generation,
        };
        self.in_flight = Some(req.clone());
        Some(req)
    }

    /// Land a page fetch. Results for an abandoned feed are dropped and
    /// `false` is returned.
    pub fn complete(&mut self, req: &PageRequest, result: Result<FeedPage<T>, String>) -> bool {
        if self.in_flight.as_ref() != Some(req) {
            tracing::debug!(
                filter = %req.filter,
                page = req.page,
                "feed: dropping stale page"
            );
            return false;
        }
        self.in_flight = None;
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        match result {
            Ok(page) => {
                feed.pages.push(page);
                feed.revision += 1;
                self.error = None;
            }
            Err(message) => self.error = Some(message),
        }
        true
    }

    pub fn items(&self) -> Vec<T> {
        self.feed
            .as_ref()
            .map(|f| f.items().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_more(&self) -> bool {
        self.feed.as_ref().map(Feed::has_more).unwrap_or(false)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_loading_first_page(&self) -> bool {
        self.in_flight.as_ref().map(|r| r.page == 1).unwrap_or(false)
    }

    pub fn loaded_pages(&self) -> usize {
        self.feed.as_ref().map(|f| f.pages.len()).unwrap_or(0)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Mark the feed out of date; the owner reloads it from page 1 the next
    /// time it is shown.
    pub fn invalidate(&mut self) {
        if self.feed.is_some() {
            self.stale = true;
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }
}

impl<T: CacheItem> FeedLoader<T> {
    /// Remove `id` from every loaded page and decrement each page's counts.
    /// Returns what [`FeedLoader::restore`] needs to undo it, or `None` if
    /// the item is not loaded.
    pub fn remove_item(&mut self, id: &str) -> Option<FeedRollback<T>> {
        let feed = self.feed.as_mut()?;
        if !feed.items().any(|item| item.item_id() == id) {
            return None;
        }
        let captured = feed.pages.clone();
        // Counts are feed-wide values repeated on every page.
        for page in &mut feed.pages {
            page.items.retain(|item| item.item_id() != id);
            page.total = page.total.map(|t| t.saturating_sub(1));
            page.found = page.found.map(|f| f.saturating_sub(1));
        }
        feed.revision += 1;
        Some(FeedRollback {
            generation: self.generation,
            revision: feed.revision,
            pages: captured,
        })
    }

    /// Undo a removal, but only if the feed has not changed since. Returns
    /// whether the pages were restored.
    pub fn restore(&mut self, rollback: FeedRollback<T>) -> bool {
        if rollback.generation != self.generation {
            return false;
        }
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        if feed.revision != rollback.revision {
            return false;
        }
        feed.pages = rollback.pages;
        feed.revision += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Row(String);

    impl CacheItem for Row {
        fn item_id(&self) -> &str {
            &self.0
        }
    }

    fn rows(ids: &[&str]) -> Vec<Row> {
        ids.iter().map(|id| Row(id.to_string())).collect()
    }

    fn page(ids: &[&str], n: u32, has_more: bool, total: u32) -> FeedPage<Row> {
        FeedPage {
            items: rows(ids),
            page: n,
            has_more,
            total: Some(total),
            found: Some(total),
        }
    }

    #[test]
    fn pages_append_in_order() {
        let mut loader = FeedLoader::new();
        loader.set_filter("ALL");

        let first = loader.load_next().unwrap();
        assert_eq!(first.page, 1);
        assert!(loader.complete(&first, Ok(page(&["a", "b"], 1, true, 3))));

        let second = loader.load_next().unwrap();
        assert_eq!(second.page, 2);
        assert!(loader.complete(&second, Ok(page(&["c"], 2, false, 3))));

        assert_eq!(loader.items(), rows(&["a", "b", "c"]));
        assert!(!loader.has_more());
        assert!(loader.load_next().is_none());
    }

    #[test]
    fn load_next_is_idempotent_while_in_flight() {
        let mut loader: FeedLoader<Row> = FeedLoader::new();
        loader.set_filter("ALL");
        let req = loader.load_next().unwrap();
        loader.complete(&req, Ok(page(&["a"], 1, true, 2)));

        let second = loader.load_next();
        assert!(second.is_some());
        assert!(loader.load_next().is_none());
        assert!(loader.is_loading());

        loader.complete(&second.unwrap(), Ok(page(&["b"], 2, false, 2)));
        assert_eq!(loader.loaded_pages(), 2);
    }

    #[test]
    fn switching_filter_never_merges_pages() {
        let mut loader = FeedLoader::new();
        loader.set_filter("ALL");
        let req = loader.load_next().unwrap();
        loader.complete(&req, Ok(page(&["a", "b"], 1, true, 4)));
        let orphan = loader.load_next().unwrap();

        assert!(loader.set_filter("SAVAGE"));
        assert!(loader.items().is_empty());
        assert!(!loader.complete(&orphan, Ok(page(&["c", "d"], 2, false, 4))));

        let fresh = loader.load_next().unwrap();
        assert_eq!(fresh.page, 1);
        assert_eq!(fresh.filter, "SAVAGE");
        loader.complete(&fresh, Ok(page(&["s1"], 1, false, 1)));
        assert_eq!(loader.items(), rows(&["s1"]));
        assert!(!loader.set_filter("SAVAGE"));
    }

    #[test]
    fn failed_page_keeps_loaded_pages_and_can_retry() {
        let mut loader = FeedLoader::new();
        loader.set_filter("ALL");
        let req = loader.load_next().unwrap();
        loader.complete(&req, Ok(page(&["a"], 1, true, 2)));

        let req = loader.load_next().unwrap();
        loader.complete(&req, Err("offline".into()));
        assert_eq!(loader.error(), Some("offline"));
        assert_eq!(loader.items(), rows(&["a"]));

        let retry = loader.load_next().unwrap();
        assert_eq!(retry.page, 2);
    }

    #[test]
    fn remove_item_updates_every_feed_and_counts() {
        let mut by_tag = FeedLoader::new();
        by_tag.set_filter("ALL");
        let req = by_tag.load_next().unwrap();
        by_tag.complete(&req, Ok(page(&["x", "y"], 1, true, 10)));
        let req = by_tag.load_next().unwrap();
        by_tag.complete(&req, Ok(page(&["z"], 2, true, 10)));

        let mut search = FeedLoader::new();
        search.set_filter("roast");
        let req = search.load_next().unwrap();
        search.complete(&req, Ok(page(&["y"], 1, false, 1)));

        assert!(by_tag.remove_item("y").is_some());
        assert!(search.remove_item("y").is_some());

        assert_eq!(by_tag.items(), rows(&["x", "z"]));
        assert_eq!(by_tag.feed().unwrap().total(), Some(9));
        assert!(search.items().is_empty());
        assert_eq!(search.feed().unwrap().found(), Some(0));
        assert!(by_tag.remove_item("missing").is_none());
    }

    #[test]
    fn restore_only_when_feed_unchanged() {
        let mut loader = FeedLoader::new();
        loader.set_filter("ALL");
        let req = loader.load_next().unwrap();
        loader.complete(&req, Ok(page(&["a", "b"], 1, true, 3)));

        let rollback = loader.remove_item("a").unwrap();
        assert!(loader.restore(rollback));
        assert_eq!(loader.items(), rows(&["a", "b"]));
        assert_eq!(loader.feed().unwrap().total(), Some(3));

        let rollback = loader.remove_item("a").unwrap();
        let req = loader.load_next().unwrap();
        loader.complete(&req, Ok(page(&["c"], 2, false, 2)));
        assert!(!loader.restore(rollback));
        assert_eq!(loader.items(), rows(&["b", "c"]));
    }
}
