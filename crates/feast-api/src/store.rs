//! Domain store collaborator.
//!
//! Endpoints reach feeds and items only through [`DomainStore`]. The
//! in-memory [`MemoryStore`] backs the binary and the tests.

use std::collections::{BTreeMap, HashMap, HashSet};

use feast_core::ApiError;
use parking_lot::RwLock;
use thiserror::Error;

use crate::model::{Feed, FeedId, FeedPatch, Item, ItemId, ItemQuery, NewFeed, NewItem};

/// Store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("{kind} {id} not found")]
    NotFound {
        /// Record kind, `feed` or `item`.
        kind: &'static str,
        /// Requested id.
        id: u64,
    },

    /// A field value was rejected.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// What was expected.
        reason: String,
    },

    /// The backing storage failed.
    #[error("store backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Missing feed.
    #[must_use]
    pub fn feed_not_found(id: FeedId) -> Self {
        Self::NotFound { kind: "feed", id }
    }

    /// Missing item.
    #[must_use]
    pub fn item_not_found(id: ItemId) -> Self {
        Self::NotFound { kind: "item", id }
    }

    /// Rejected field.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { kind, id } => {
                let mut title = kind.to_string();
                if let Some(first) = title.get_mut(..1) {
                    first.make_ascii_uppercase();
                }
                ApiError::not_found(&format!("{title} {id}"))
            }
            StoreError::Invalid { field, reason } => ApiError::invalid_parameter(field, &reason),
            StoreError::Backend(message) => {
                tracing::error!(detail = %message, "domain store failure");
                ApiError::internal("The feed store is unavailable")
            }
        }
    }
}

/// Store operation result.
pub type StoreResult<T> = Result<T, StoreError>;

/// Feed and item persistence with per-user read flags.
///
/// `viewer` is the id of the calling principal; `None` means anonymous,
/// for whom every item reads as unread.
pub trait DomainStore: Send + Sync {
    /// Feeds in id order. `limit <= 0` lists all.
    fn feeds(&self, limit: i64) -> StoreResult<Vec<Feed>>;

    /// One feed.
    fn feed(&self, id: FeedId) -> StoreResult<Feed>;

    /// Adds a feed.
    fn create_feed(&self, feed: NewFeed) -> StoreResult<Feed>;

    /// Applies a patch to a feed.
    fn update_feed(&self, id: FeedId, patch: FeedPatch) -> StoreResult<Feed>;

    /// Removes a feed and its items, returning the removed feed.
    fn delete_feed(&self, id: FeedId) -> StoreResult<Feed>;

    /// Items newest first, windowed by `query`.
    fn items(&self, query: &ItemQuery, viewer: Option<&str>) -> StoreResult<Vec<Item>>;

    /// One item.
    fn item(&self, id: ItemId, viewer: Option<&str>) -> StoreResult<Item>;

    /// Adds an item to an existing feed.
    fn add_item(&self, item: NewItem) -> StoreResult<Item>;

    /// Sets the read flag of one item for `user`.
    fn set_read(&self, id: ItemId, user: &str, read: bool) -> StoreResult<Item>;

    /// Sets the read flag of several items for `user`.
    ///
    /// The default marks them one at a time and stops at the first missing
    /// item.
    fn mark_read(&self, ids: &[ItemId], user: &str, read: bool) -> StoreResult<Vec<Item>> {
        ids.iter().map(|id| self.set_read(*id, user, read)).collect()
    }

    /// Removes an item, returning it as `viewer` saw it.
    fn delete_item(&self, id: ItemId, viewer: Option<&str>) -> StoreResult<Item>;
}

#[derive(Debug, Default)]
struct State {
    last_feed: FeedId,
    last_item: ItemId,
    feeds: BTreeMap<FeedId, Feed>,
    items: BTreeMap<ItemId, Item>,
    read: HashMap<String, HashSet<ItemId>>,
}

impl State {
    fn is_read(&self, viewer: Option<&str>, id: ItemId) -> bool {
        viewer
            .and_then(|user| self.read.get(user))
            .is_some_and(|set| set.contains(&id))
    }

    fn view(&self, item: &Item, viewer: Option<&str>) -> Item {
        Item {
            read: self.is_read(viewer, item.id),
            ..item.clone()
        }
    }

    fn set_read(&mut self, id: ItemId, user: &str, read: bool) {
        let set = self.read.entry(user.to_string()).or_default();
        if read {
            set.insert(id);
        } else {
            set.remove(&id);
        }
    }

    fn forget_item(&mut self, id: ItemId) {
        for set in self.read.values_mut() {
            set.remove(&id);
        }
    }
}

/// In-memory [`DomainStore`].
///
/// # Example
///
/// ```
/// use feast_api::{DomainStore, MemoryStore, NewFeed};
///
/// let store = MemoryStore::new();
/// let feed = store
///     .create_feed(NewFeed {
///         title: "Planet".into(),
///         url: "https://planet.example/rss".into(),
///         icon: None,
///     })
///     .unwrap();
/// assert_eq!(store.feed(feed.id).unwrap().title, "Planet");
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of feeds.
    pub fn feed_count(&self) -> usize {
        self.state.read().feeds.len()
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.state.read().items.len()
    }
}

fn check_title(title: &str) -> StoreResult<()> {
    if title.trim().is_empty() {
        return Err(StoreError::invalid("title", "a non-empty string"));
    }
    Ok(())
}

fn check_url(field: &'static str, url: &str) -> StoreResult<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(StoreError::invalid(field, "an http or https URL"))
    }
}

impl DomainStore for MemoryStore {
    fn feeds(&self, limit: i64) -> StoreResult<Vec<Feed>> {
        let state = self.state.read();
        let take = usize::try_from(limit)
            .ok()
            .filter(|n| *n > 0)
            .unwrap_or(usize::MAX);
        Ok(state.feeds.values().take(take).cloned().collect())
    }

    fn feed(&self, id: FeedId) -> StoreResult<Feed> {
        self.state
            .read()
            .feeds
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::feed_not_found(id))
    }

    fn create_feed(&self, feed: NewFeed) -> StoreResult<Feed> {
        check_title(&feed.title)?;
        check_url("url", &feed.url)?;
        if let Some(icon) = &feed.icon {
            check_url("icon", icon)?;
        }

        let mut state = self.state.write();
        state.last_feed += 1;
        let created = Feed {
            id: state.last_feed,
            permalink: feed.url.clone(),
            title: feed.title,
            url: feed.url,
            icon: feed.icon,
        };
        state.feeds.insert(created.id, created.clone());
        tracing::debug!(feed_id = created.id, "feed created");
        Ok(created)
    }

    fn update_feed(&self, id: FeedId, patch: FeedPatch) -> StoreResult<Feed> {
        if let Some(title) = &patch.title {
            check_title(title)?;
        }
        if let Some(url) = &patch.url {
            check_url("url", url)?;
        }
        if let Some(icon) = &patch.icon {
            check_url("icon", icon)?;
        }

        let mut state = self.state.write();
        let feed = state
            .feeds
            .get_mut(&id)
            .ok_or_else(|| StoreError::feed_not_found(id))?;
        if let Some(title) = patch.title {
            feed.title = title;
        }
        if let Some(url) = patch.url {
            feed.url = url;
        }
        if patch.icon.is_some() {
            feed.icon = patch.icon;
        }
        Ok(feed.clone())
    }

    fn delete_feed(&self, id: FeedId) -> StoreResult<Feed> {
        let mut state = self.state.write();
        let feed = state
            .feeds
            .remove(&id)
            .ok_or_else(|| StoreError::feed_not_found(id))?;

        let orphaned: Vec<ItemId> = state
            .items
            .values()
            .filter(|item| item.feed_id == id)
            .map(|item| item.id)
            .collect();
        for item in &orphaned {
            state.items.remove(item);
            state.forget_item(*item);
        }
        tracing::debug!(feed_id = id, items = orphaned.len(), "feed deleted");
        Ok(feed)
    }

    fn items(&self, query: &ItemQuery, viewer: Option<&str>) -> StoreResult<Vec<Item>> {
        let state = self.state.read();
        let feed = query.feed_filter();
        let mut matching: Vec<&Item> = state
            .items
            .values()
            .filter(|item| feed.map_or(true, |f| item.feed_id == f))
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        let window = query.window(matching.len());
        Ok(matching[window]
            .iter()
            .map(|item| state.view(item, viewer))
            .collect())
    }

    fn item(&self, id: ItemId, viewer: Option<&str>) -> StoreResult<Item> {
        let state = self.state.read();
        state
            .items
            .get(&id)
            .map(|item| state.view(item, viewer))
            .ok_or_else(|| StoreError::item_not_found(id))
    }

    fn add_item(&self, item: NewItem) -> StoreResult<Item> {
        check_title(&item.title)?;

        let mut state = self.state.write();
        if !state.feeds.contains_key(&item.feed_id) {
            return Err(StoreError::feed_not_found(item.feed_id));
        }
        state.last_item += 1;
        let created = Item {
            id: state.last_item,
            feed_id: item.feed_id,
            title: item.title,
            timestamp: item.timestamp,
            permalink: item.permalink,
            content: item.content,
            author: item.author,
            read: false,
        };
        state.items.insert(created.id, created.clone());
        Ok(created)
    }

    fn set_read(&self, id: ItemId, user: &str, read: bool) -> StoreResult<Item> {
        let mut state = self.state.write();
        if !state.items.contains_key(&id) {
            return Err(StoreError::item_not_found(id));
        }
        state.set_read(id, user, read);
        let item = &state.items[&id];
        Ok(state.view(item, Some(user)))
    }

    fn mark_read(&self, ids: &[ItemId], user: &str, read: bool) -> StoreResult<Vec<Item>> {
        let mut state = self.state.write();
        if let Some(missing) = ids.iter().find(|id| !state.items.contains_key(id)) {
            return Err(StoreError::item_not_found(*missing));
        }
        for id in ids {
            state.set_read(*id, user, read);
        }
        Ok(ids
            .iter()
            .map(|id| state.view(&state.items[id], Some(user)))
            .collect())
    }

    fn delete_item(&self, id: ItemId, viewer: Option<&str>) -> StoreResult<Item> {
        let mut state = self.state.write();
        let item = state
            .items
            .remove(&id)
            .ok_or_else(|| StoreError::item_not_found(id))?;
        let seen = state.view(&item, viewer);
        state.forget_item(id);
        Ok(seen)
    }
}
