//! Base route list and handler registration.

use std::sync::Arc;

use feast_core::{ApiResult, Args, FnHandler, Handler, ParamSpec, RequestContext};
use feast_router::{
    compose, HandlerEntry, MethodMask, PatternError, Route, RouteExtension, RouteTable,
};
use feast_server::{Dispatcher, HandlerRegistry};
use serde::Serialize;
use serde_json::Value;

use crate::endpoints;
use crate::store::DomainStore;

/// Callback names used by the base routes.
pub mod callbacks {
    /// Route listing.
    pub const INDEX: &str = "api.index";
    /// Feed listing.
    pub const FEEDS_LIST: &str = "feeds.list";
    /// Feed creation.
    pub const FEEDS_CREATE: &str = "feeds.create";
    /// Single feed.
    pub const FEEDS_GET: &str = "feeds.get";
    /// Feed update.
    pub const FEEDS_EDIT: &str = "feeds.edit";
    /// Feed removal.
    pub const FEEDS_DELETE: &str = "feeds.delete";
    /// Item listing.
    pub const ITEMS_LIST: &str = "items.list";
    /// Single item.
    pub const ITEMS_GET: &str = "items.get";
    /// Item read flag update.
    pub const ITEMS_EDIT: &str = "items.edit";
    /// Item removal.
    pub const ITEMS_DELETE: &str = "items.delete";
    /// Bulk read flag update.
    pub const ITEMS_MARK_READ: &str = "items.mark_read";
}

use self::callbacks::{
    FEEDS_CREATE, FEEDS_DELETE, FEEDS_EDIT, FEEDS_GET, FEEDS_LIST, INDEX, ITEMS_DELETE, ITEMS_EDIT,
    ITEMS_GET, ITEMS_LIST, ITEMS_MARK_READ,
};

/// The built-in route table, in lookup order.
pub fn base_routes() -> Result<RouteTable, PatternError> {
    let item_edit = MethodMask::PUT.union(MethodMask::PATCH);

    Ok(RouteTable::new()
        .with(Route::new("/")?.entry(HandlerEntry::new(INDEX, MethodMask::READABLE).hidden()))
        .with(
            Route::new("/feeds")?
                .entry(HandlerEntry::new(FEEDS_LIST, MethodMask::READABLE))
                .entry(HandlerEntry::new(FEEDS_CREATE, MethodMask::CREATABLE).accept_json()),
        )
        .with(
            Route::new("/feeds/{id}")?
                .entry(HandlerEntry::new(FEEDS_GET, MethodMask::READABLE))
                .entry(HandlerEntry::new(FEEDS_EDIT, MethodMask::EDITABLE).accept_json())
                .entry(HandlerEntry::new(FEEDS_DELETE, MethodMask::DELETABLE)),
        )
        .with(
            Route::new("/feeds/{feed}/items")?
                .entry(HandlerEntry::new(ITEMS_LIST, MethodMask::READABLE)),
        )
        .with(
            Route::new("/feeds/{feed}/items/{id}")?
                .entry(HandlerEntry::new(ITEMS_GET, MethodMask::READABLE))
                .entry(HandlerEntry::new(ITEMS_EDIT, item_edit).accept_json()),
        )
        .with(Route::new("/items")?.entry(HandlerEntry::new(ITEMS_LIST, MethodMask::READABLE)))
        .with(
            Route::new("/items/read")?
                .entry(HandlerEntry::new(ITEMS_MARK_READ, MethodMask::CREATABLE).accept_json()),
        )
        .with(
            Route::new("/items/{id}")?
                .entry(HandlerEntry::new(ITEMS_GET, MethodMask::READABLE))
                .entry(HandlerEntry::new(ITEMS_EDIT, MethodMask::EDITABLE).accept_json())
                .entry(HandlerEntry::new(ITEMS_DELETE, MethodMask::DELETABLE)),
        ))
}

fn endpoint<T, F>(store: &Arc<dyn DomainStore>, params: Vec<ParamSpec>, body: F) -> impl Handler
where
    F: Fn(&dyn DomainStore, &RequestContext, Args) -> ApiResult<T> + Send + Sync + 'static,
    T: Serialize + Send + 'static,
{
    let store = Arc::clone(store);
    FnHandler::new(params, move |ctx: &RequestContext, args: Args| {
        std::future::ready(body(store.as_ref(), ctx, args))
    })
}

fn item_list_params() -> Vec<ParamSpec> {
    vec![
        ParamSpec::optional("limit", 20),
        ParamSpec::optional("start", 0),
        ParamSpec::optional("page", 1),
        ParamSpec::optional("feed", 0),
    ]
}

/// Registers every base callback against `store`.
///
/// `table` is the table the dispatcher will use; `api.index` lists it.
pub fn register_handlers(
    registry: &mut HandlerRegistry,
    store: Arc<dyn DomainStore>,
    table: Arc<RouteTable>,
) {
    registry.register(
        INDEX,
        FnHandler::new(Vec::new(), move |_ctx: &RequestContext, _args: Args| {
            std::future::ready(Ok::<Value, _>(endpoints::index(&table)))
        }),
    );

    registry.register(
        FEEDS_LIST,
        endpoint(&store, vec![ParamSpec::optional("limit", 40)], endpoints::list_feeds),
    );
    registry.register(
        FEEDS_CREATE,
        endpoint(
            &store,
            vec![
                ParamSpec::required("title"),
                ParamSpec::required("url"),
                ParamSpec::optional("icon", Value::Null),
            ],
            endpoints::create_feed,
        ),
    );
    registry.register(
        FEEDS_GET,
        endpoint(&store, vec![ParamSpec::required("id")], endpoints::get_feed),
    );
    registry.register(
        FEEDS_EDIT,
        endpoint(
            &store,
            vec![
                ParamSpec::required("id"),
                ParamSpec::optional("title", Value::Null),
                ParamSpec::optional("url", Value::Null),
                ParamSpec::optional("icon", Value::Null),
            ],
            endpoints::edit_feed,
        ),
    );
    registry.register(
        FEEDS_DELETE,
        endpoint(&store, vec![ParamSpec::required("id")], endpoints::delete_feed),
    );

    registry.register(
        ITEMS_LIST,
        endpoint(&store, item_list_params(), endpoints::list_items),
    );
    registry.register(
        ITEMS_GET,
        endpoint(
            &store,
            vec![ParamSpec::required("id"), ParamSpec::optional("feed", 0)],
            endpoints::get_item,
        ),
    );
    registry.register(
        ITEMS_EDIT,
        endpoint(
            &store,
            vec![
                ParamSpec::required("id"),
                ParamSpec::optional("read", Value::Null),
                ParamSpec::optional("feed", 0),
            ],
            endpoints::edit_item,
        ),
    );
    registry.register(
        ITEMS_DELETE,
        endpoint(&store, vec![ParamSpec::required("id")], endpoints::delete_item),
    );
    registry.register(
        ITEMS_MARK_READ,
        endpoint(
            &store,
            vec![ParamSpec::required("items"), ParamSpec::optional("read", true)],
            endpoints::mark_read,
        ),
    );
}

/// Builds a dispatcher over the base routes, extended in order by
/// `extensions`, with every base callback bound to `store`.
///
/// Extensions may add routes whose callbacks are registered afterwards
/// through [`HandlerRegistry`]; unregistered callbacks answer
/// `invalid_handler`.
pub fn build_dispatcher<'a>(
    store: Arc<dyn DomainStore>,
    extensions: impl IntoIterator<Item = &'a dyn RouteExtension>,
    extra: impl FnOnce(&mut HandlerRegistry),
) -> Result<Dispatcher, PatternError> {
    let table = Arc::new(compose(base_routes()?, extensions));
    let mut registry = HandlerRegistry::new();
    register_handlers(&mut registry, store, Arc::clone(&table));
    extra(&mut registry);
    tracing::debug!(
        routes = table.len(),
        handlers = registry.len(),
        "dispatcher assembled"
    );
    Ok(Dispatcher::from_shared(table, Arc::new(registry)))
}
