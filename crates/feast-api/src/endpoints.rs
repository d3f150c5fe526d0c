//! Endpoint bodies.
//!
//! The binder hands over raw values: path captures and query parameters
//! arrive as strings, JSON bodies keep their types. Each endpoint coerces
//! what it needs with the helpers below and fails with `invalid_parameter`
//! when a value does not fit.

use feast_core::{ApiError, ApiResult, Args, Principal, RequestContext};
use feast_router::RouteTable;
use serde_json::{json, Value};

use crate::model::{Feed, FeedId, FeedPatch, Item, ItemId, ItemQuery, NewFeed};
use crate::store::DomainStore;

/// Reads an integer from a JSON number or a decimal string.
pub fn int_param(name: &str, value: &Value) -> ApiResult<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::invalid_parameter(name, "an integer"))
}

/// Reads a non-negative integer.
pub fn id_param(name: &str, value: &Value) -> ApiResult<u64> {
    int_param(name, value).and_then(|n| {
        u64::try_from(n).map_err(|_| ApiError::invalid_parameter(name, "a non-negative integer"))
    })
}

/// Reads a boolean from a JSON boolean, `0`/`1`, or `true|false|1|0`.
pub fn bool_param(name: &str, value: &Value) -> ApiResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) if n.as_u64() == Some(1) => Ok(true),
        Value::Number(n) if n.as_u64() == Some(0) => Ok(false),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(ApiError::invalid_parameter(name, "a boolean")),
        },
        _ => Err(ApiError::invalid_parameter(name, "a boolean")),
    }
}

/// Reads a string. Numbers are accepted in their decimal form.
pub fn string_param(name: &str, value: Value) -> ApiResult<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(ApiError::invalid_parameter(name, "a string")),
    }
}

/// Reads a string, with `null` meaning absent.
pub fn optional_string_param(name: &str, value: Value) -> ApiResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => string_param(name, other).map(Some),
    }
}

/// Reads a list of ids from a JSON array or a comma-separated string.
pub fn id_list_param(name: &str, value: &Value) -> ApiResult<Vec<ItemId>> {
    let invalid = || ApiError::invalid_parameter(name, "a list of item ids");
    match value {
        Value::Array(values) => values
            .iter()
            .map(|v| id_param(name, v).map_err(|_| invalid()))
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| part.parse().map_err(|_| invalid()))
            .collect(),
        Value::Number(_) => id_param(name, value).map(|id| vec![id]),
        _ => Err(invalid()),
    }
}

fn require_user(ctx: &RequestContext) -> ApiResult<&Principal> {
    ctx.principal().ok_or_else(ApiError::unauthenticated)
}

fn viewer(ctx: &RequestContext) -> Option<&str> {
    ctx.principal().map(Principal::id)
}

/// `api.index`: every visible route entry.
pub fn index(table: &RouteTable) -> Value {
    table
        .describe()
        .into_iter()
        .map(|d| {
            json!({
                "pattern": d.pattern,
                "methods": d.methods,
                "accepts_json": d.accepts_json,
            })
        })
        .collect()
}

/// `feeds.list(limit)`
pub fn list_feeds(store: &dyn DomainStore, _ctx: &RequestContext, args: Args) -> ApiResult<Vec<Feed>> {
    let [limit] = args.into_array()?;
    Ok(store.feeds(int_param("limit", &limit)?)?)
}

/// `feeds.get(id)`
pub fn get_feed(store: &dyn DomainStore, _ctx: &RequestContext, args: Args) -> ApiResult<Feed> {
    let [id] = args.into_array()?;
    Ok(store.feed(id_param("id", &id)?)?)
}

/// `feeds.create(title, url, icon)`
pub fn create_feed(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Feed> {
    let user = require_user(ctx)?;
    let [title, url, icon] = args.into_array()?;
    let feed = store.create_feed(NewFeed {
        title: string_param("title", title)?,
        url: string_param("url", url)?,
        icon: optional_string_param("icon", icon)?,
    })?;
    tracing::info!(feed_id = feed.id, user = %user.log_id(), "feed added");
    Ok(feed)
}

/// `feeds.edit(id, title, url, icon)`
pub fn edit_feed(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Feed> {
    require_user(ctx)?;
    let [id, title, url, icon] = args.into_array()?;
    let id = id_param("id", &id)?;
    let patch = FeedPatch {
        title: optional_string_param("title", title)?,
        url: optional_string_param("url", url)?,
        icon: optional_string_param("icon", icon)?,
    };
    if patch.is_empty() {
        return Ok(store.feed(id)?);
    }
    Ok(store.update_feed(id, patch)?)
}

/// `feeds.delete(id)`
pub fn delete_feed(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Feed> {
    let user = require_user(ctx)?;
    let [id] = args.into_array()?;
    let feed = store.delete_feed(id_param("id", &id)?)?;
    tracing::info!(feed_id = feed.id, user = %user.log_id(), "feed removed");
    Ok(feed)
}

/// `items.list(limit, start, page, feed)`
pub fn list_items(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Vec<Item>> {
    let [limit, start, page, feed] = args.into_array()?;
    let query = ItemQuery {
        limit: int_param("limit", &limit)?,
        start: id_param("start", &start)?,
        page: id_param("page", &page)?,
        feed: id_param("feed", &feed)?,
    };
    if let Some(feed) = query.feed_filter() {
        store.feed(feed)?;
    }
    Ok(store.items(&query, viewer(ctx))?)
}

fn item_in_feed(store: &dyn DomainStore, ctx: &RequestContext, id: ItemId, feed: FeedId) -> ApiResult<Item> {
    let item = store.item(id, viewer(ctx))?;
    if feed > 0 && item.feed_id != feed {
        return Err(ApiError::not_found(&format!("Item {id}")));
    }
    Ok(item)
}

/// `items.get(id, feed)`
pub fn get_item(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Item> {
    let [id, feed] = args.into_array()?;
    item_in_feed(store, ctx, id_param("id", &id)?, id_param("feed", &feed)?)
}

/// `items.edit(id, read, feed)`
pub fn edit_item(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Item> {
    let user = require_user(ctx)?;
    let [id, read, feed] = args.into_array()?;
    let item = item_in_feed(store, ctx, id_param("id", &id)?, id_param("feed", &feed)?)?;
    if read.is_null() {
        return Ok(item);
    }
    Ok(store.set_read(item.id, user.id(), bool_param("read", &read)?)?)
}

/// `items.delete(id)`
pub fn delete_item(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Item> {
    let user = require_user(ctx)?;
    let [id] = args.into_array()?;
    let item = store.delete_item(id_param("id", &id)?, Some(user.id()))?;
    tracing::info!(item_id = item.id, user = %user.log_id(), "item removed");
    Ok(item)
}

/// `items.mark_read(items, read)`
pub fn mark_read(store: &dyn DomainStore, ctx: &RequestContext, args: Args) -> ApiResult<Vec<Item>> {
    let user = require_user(ctx)?;
    let [items, read] = args.into_array()?;
    let ids = id_list_param("items", &items)?;
    let read = bool_param("read", &read)?;
    Ok(store.mark_read(&ids, user.id(), read)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_int_param() {
        assert_eq!(int_param("n", &json!(5)).unwrap(), 5);
        assert_eq!(int_param("n", &json!(" -3 ")).unwrap(), -3);
        let err = int_param("n", &json!("five")).unwrap_err();
        assert_eq!(err.code(), "invalid_parameter");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(int_param("n", &json!(1.5)).is_err());
        assert!(id_param("n", &json!(-1)).is_err());
    }

    #[test]
    fn test_bool_param() {
        assert!(bool_param("b", &json!(true)).unwrap());
        assert!(bool_param("b", &json!("1")).unwrap());
        assert!(!bool_param("b", &json!("FALSE")).unwrap());
        assert!(!bool_param("b", &json!(0)).unwrap());
        assert!(bool_param("b", &json!("yes")).is_err());
        assert!(bool_param("b", &Value::Null).is_err());
    }

    #[test]
    fn test_string_params() {
        assert_eq!(string_param("s", json!("x")).unwrap(), "x");
        assert_eq!(string_param("s", json!(12)).unwrap(), "12");
        assert!(string_param("s", json!([1])).is_err());
        assert_eq!(optional_string_param("s", Value::Null).unwrap(), None);
    }

    #[test]
    fn test_id_list_param() {
        assert_eq!(id_list_param("items", &json!([1, "2"])).unwrap(), [1, 2]);
        assert_eq!(id_list_param("items", &json!("3, 4,")).unwrap(), [3, 4]);
        assert_eq!(id_list_param("items", &json!(9)).unwrap(), [9]);
        assert!(id_list_param("items", &json!("a,b")).is_err());
        assert!(id_list_param("items", &json!({})).is_err());
    }
}
