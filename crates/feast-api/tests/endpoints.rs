//! Feed and item endpoints over the in-memory client.

use std::sync::Arc;

use feast_api::{build_dispatcher, Author, DomainStore, MemoryStore, NewFeed, NewItem};
use feast_server::{AuthGate, FeastService, StaticCredentials};
use feast_test::TestClient;
use http::StatusCode;
use serde_json::json;

fn seeded() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    let planet = store
        .create_feed(NewFeed {
            title: "Planet".into(),
            url: "https://planet.example/rss".into(),
            icon: None,
        })
        .unwrap();
    let news = store
        .create_feed(NewFeed {
            title: "News".into(),
            url: "https://news.example/atom".into(),
            icon: Some("https://news.example/favicon.ico".into()),
        })
        .unwrap();
    for (feed, n) in [(planet.id, 1), (news.id, 2), (planet.id, 3), (news.id, 4)] {
        store
            .add_item(NewItem {
                feed_id: feed,
                title: format!("post {n}"),
                timestamp: 1_700_000_000 + n,
                permalink: format!("https://example.com/{n}"),
                content: format!("<p>{n}</p>"),
                author: Author::new("Ann", "https://ann.example"),
            })
            .unwrap();
    }
    store
}

fn client_for(store: Arc<MemoryStore>) -> TestClient {
    let dispatcher = build_dispatcher(store, [], |_| {}).unwrap();
    let service = FeastService::builder()
        .dispatcher(dispatcher)
        .auth(AuthGate::new().with_verifier(
            StaticCredentials::new()
                .with_user("admin", "secret", ["administrator"])
                .with_user("bob", "hunter2", ["reader"]),
        ))
        .build();
    TestClient::new(service)
}

fn client() -> TestClient {
    client_for(seeded())
}

#[tokio::test]
async fn test_index_lists_visible_routes() {
    let response = client().get("/").send().await;
    response.assert_status(StatusCode::OK);
    let listing = response.json_value().unwrap();
    let listing = listing.as_array().unwrap();
    assert!(listing.iter().all(|r| r["pattern"] != "/"));
    assert!(listing
        .iter()
        .any(|r| r["pattern"] == "/feeds" && r["methods"] == json!(["POST"]) && r["accepts_json"] == true));
}

#[tokio::test]
async fn test_list_and_get_feeds() {
    let client = client();
    let response = client.get("/feeds").send().await;
    response
        .assert_status(StatusCode::OK)
        .assert_json_field("0.title", &json!("Planet"))
        .assert_json_field("1.icon", &json!("https://news.example/favicon.ico"));

    client.get("/feeds").query("limit", 1).send().await.assert_json_eq(&json!([{
        "id": 1,
        "title": "Planet",
        "url": "https://planet.example/rss",
        "icon": null,
        "permalink": "https://planet.example/rss"
    }]));

    client
        .get("/feeds/2")
        .send()
        .await
        .assert_json_field("title", &json!("News"));
    client
        .get("/feeds/9")
        .send()
        .await
        .assert_error(StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_invalid_integer_parameter() {
    client()
        .get("/feeds")
        .query("limit", "lots")
        .send()
        .await
        .assert_error(StatusCode::BAD_REQUEST, "invalid_parameter");
}

#[tokio::test]
async fn test_items_newest_first_with_paging() {
    let client = client();
    let response = client.get("/items").send().await;
    let titles: Vec<String> = response
        .json_value()
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, ["post 4", "post 3", "post 2", "post 1"]);

    client
        .get("/items")
        .query("limit", 1)
        .query("page", 2)
        .send()
        .await
        .assert_json_field("0.title", &json!("post 3"));

    client
        .get("/items")
        .query("limit", 2)
        .query("start", 3)
        .query("page", 1)
        .send()
        .await
        .assert_json_field("0.title", &json!("post 1"));
}

#[tokio::test]
async fn test_feed_items_are_filtered_by_capture() {
    let client = client();
    let items = client.get("/feeds/2/items").send().await.json_value().unwrap();
    let feeds: Vec<u64> = items
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["feed_id"].as_u64().unwrap())
        .collect();
    assert_eq!(feeds, [2, 2]);

    client
        .get("/feeds/7/items")
        .send()
        .await
        .assert_error(StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_item_under_wrong_feed_is_not_found() {
    let client = client();
    client
        .get("/feeds/1/items/1")
        .send()
        .await
        .assert_json_field("author.name", &json!("Ann"));
    client
        .get("/feeds/2/items/1")
        .send()
        .await
        .assert_error(StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_create_feed_requires_authentication() {
    let client = client();
    let body = json!({ "title": "Blog", "url": "https://blog.example/feed" });

    client
        .post("/feeds")
        .json(&body)
        .send()
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "unauthenticated");

    client
        .post("/feeds")
        .basic_auth("admin", "nope")
        .json(&body)
        .send()
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "invalid_credentials");

    client
        .post("/feeds")
        .basic_auth("admin", "secret")
        .json(&body)
        .send()
        .await
        .assert_status(StatusCode::OK)
        .assert_json_field("id", &json!(3))
        .assert_json_field("title", &json!("Blog"));
}

#[tokio::test]
async fn test_create_feed_missing_and_invalid() {
    let client = client().with_basic_auth("admin", "secret");
    let response = client.post("/feeds").json(&json!({ "title": "Blog" })).send().await;
    response.assert_error(StatusCode::BAD_REQUEST, "missing_parameter");

    client
        .post("/feeds")
        .json(&json!({ "title": "Blog", "url": "gopher://x" }))
        .send()
        .await
        .assert_error(StatusCode::BAD_REQUEST, "invalid_parameter");
}

#[tokio::test]
async fn test_edit_feed_via_method_override() {
    let client = client().with_basic_auth("admin", "secret");
    client
        .post("/feeds/1")
        .method_override("PATCH")
        .query("title", "Planet Rust")
        .send()
        .await
        .assert_json_field("title", &json!("Planet Rust"))
        .assert_json_field("url", &json!("https://planet.example/rss"));
}

#[tokio::test]
async fn test_delete_feed_removes_items() {
    let store = seeded();
    let client = client_for(Arc::clone(&store)).with_basic_auth("admin", "secret");
    client
        .delete("/feeds/1")
        .send()
        .await
        .assert_json_field("title", &json!("Planet"));
    assert_eq!(store.feed_count(), 1);
    assert_eq!(store.item_count(), 2);
}

#[tokio::test]
async fn test_read_flags_per_user() {
    let client = client();
    client
        .put("/items/2")
        .basic_auth("bob", "hunter2")
        .json(&json!({ "read": true }))
        .send()
        .await
        .assert_json_field("read", &json!(true));

    client
        .get("/items/2")
        .basic_auth("bob", "hunter2")
        .send()
        .await
        .assert_json_field("read", &json!(true));
    client
        .get("/items/2")
        .basic_auth("admin", "secret")
        .send()
        .await
        .assert_json_field("read", &json!(false));
    client
        .get("/items/2")
        .send()
        .await
        .assert_json_field("read", &json!(false));
}

#[tokio::test]
async fn test_mark_read_accepts_list_forms() {
    let client = client().with_basic_auth("bob", "hunter2");
    client
        .post("/items/read")
        .json(&json!({ "items": [1, 2] }))
        .send()
        .await
        .assert_json_field("1.read", &json!(true));

    client
        .post("/items/read")
        .form(&[("items", "3,4"), ("read", "1")])
        .send()
        .await
        .assert_json_field("0.id", &json!(3));

    client
        .post("/items/read")
        .json(&json!({ "items": "1,x" }))
        .send()
        .await
        .assert_error(StatusCode::BAD_REQUEST, "invalid_parameter");

    client
        .post("/items/read")
        .json(&json!({ "items": [1], "read": "maybe" }))
        .send()
        .await
        .assert_error(StatusCode::BAD_REQUEST, "invalid_parameter");
}

#[tokio::test]
async fn test_delete_item() {
    let client = client();
    client
        .delete("/items/3")
        .send()
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "unauthenticated");
    client
        .delete("/items/3")
        .basic_auth("admin", "secret")
        .send()
        .await
        .assert_json_field("title", &json!("post 3"));
    client
        .get("/items/3")
        .send()
        .await
        .assert_error(StatusCode::NOT_FOUND, "not_found");
}

#[tokio::test]
async fn test_item_edit_under_feed_rejects_post() {
    client()
        .post("/feeds/1/items/1")
        .basic_auth("admin", "secret")
        .send()
        .await
        .assert_error(StatusCode::METHOD_NOT_ALLOWED, "invalid_http_method");
}

#[tokio::test]
async fn test_jsonp_listing() {
    let response = client().get("/feeds/1").jsonp("show").send().await;
    assert_eq!(response.jsonp_value("show").unwrap()["id"], 1);
}
