//! Feed and item records as the API returns them.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// Feed identifier.
pub type FeedId = u64;

/// Item identifier.
pub type ItemId = u64;

/// A subscribed feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Identifier.
    pub id: FeedId,
    /// Display title.
    pub title: String,
    /// Source URL the feed is fetched from.
    pub url: String,
    /// Icon URL, when one is known.
    pub icon: Option<String>,
    /// Link to the feed's site.
    pub permalink: String,
}

/// Who wrote an item. Both fields may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Display name.
    pub name: String,
    /// Home page.
    pub url: String,
}

impl Author {
    /// An author with a name and home page.
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// One entry of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Identifier.
    pub id: ItemId,
    /// Owning feed.
    pub feed_id: FeedId,
    /// Title.
    pub title: String,
    /// Publication time, unix seconds.
    pub timestamp: i64,
    /// Link to the original.
    pub permalink: String,
    /// HTML content.
    pub content: String,
    /// Author.
    pub author: Author,
    /// Read by the viewing user. Always false for anonymous callers.
    pub read: bool,
}

/// Fields for a new feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeed {
    /// Title.
    pub title: String,
    /// Source URL.
    pub url: String,
    /// Optional icon URL.
    pub icon: Option<String>,
}

/// Changes to a feed. `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedPatch {
    /// New title.
    pub title: Option<String>,
    /// New source URL.
    pub url: Option<String>,
    /// New icon URL.
    pub icon: Option<String>,
}

impl FeedPatch {
    /// True when nothing would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none() && self.icon.is_none()
    }
}

/// Fields for a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    /// Owning feed.
    pub feed_id: FeedId,
    /// Title.
    pub title: String,
    /// Publication time, unix seconds.
    pub timestamp: i64,
    /// Link to the original.
    pub permalink: String,
    /// HTML content.
    pub content: String,
    /// Author.
    pub author: Author,
}

/// Item listing window.
///
/// `limit <= 0` lists everything. A non-zero `start` is an absolute offset
/// and wins over `page`; otherwise `(page - 1) * limit` items are skipped.
/// `feed > 0` keeps one feed only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemQuery {
    /// Items per page.
    pub limit: i64,
    /// Absolute offset.
    pub start: u64,
    /// One-based page number.
    pub page: u64,
    /// Feed filter, 0 for all feeds.
    pub feed: FeedId,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            start: 0,
            page: 1,
            feed: 0,
        }
    }
}

impl ItemQuery {
    /// The slice of a `total`-long listing this query selects.
    #[must_use]
    pub fn window(&self, total: usize) -> Range<usize> {
        let limit = usize::try_from(self.limit).ok().filter(|n| *n > 0);
        let skip = if self.start > 0 {
            usize::try_from(self.start).unwrap_or(usize::MAX)
        } else {
            let page = usize::try_from(self.page.max(1) - 1).unwrap_or(usize::MAX);
            limit.map_or(0, |l| page.saturating_mul(l))
        };
        let from = skip.min(total);
        let to = limit.map_or(total, |l| from.saturating_add(l).min(total));
        from..to
    }

    /// The feed filter, if any.
    #[must_use]
    pub fn feed_filter(&self) -> Option<FeedId> {
        (self.feed > 0).then_some(self.feed)
    }
}
