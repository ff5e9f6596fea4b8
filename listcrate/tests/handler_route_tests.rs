use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    routing::post,
};
use listcrate::{EntityListHandlerFactory, ListError, ListPage, ListRequest};
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use tower::ServiceExt;

mod common;
use common::{blog, blog_factory, setup_blog_db};

#[derive(Clone)]
struct AppState {
    factory: EntityListHandlerFactory,
    db: DatabaseConnection,
}

async fn list_posts(
    State(state): State<AppState>,
    Json(params): Json<Value>,
) -> Result<ListPage<blog::post::Model>, ListError> {
    let mut handler = state.factory.orm_handler::<blog::post::Entity>(state.db.clone())?;
    handler.page(&ListRequest::from_value(params)).await
}

async fn list_comments(
    State(state): State<AppState>,
    Json(params): Json<Value>,
) -> Result<ListPage<Value>, ListError> {
    let mut handler = state
        .factory
        .array_handler_from_values("comments", Vec::new())?
        .with_converter(Value::Object);
    handler.page(&ListRequest::from_value(params)).await
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/posts/list", post(list_posts))
        .route("/comments/list", post(list_comments))
        .with_state(state)
}

async fn call(app: Router, uri: &str, params: Value) -> (StatusCode, Option<String>, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&params).unwrap()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let status = response.status();
    let total = response
        .headers()
        .get("X-Total-Count")
        .map(|value| value.to_str().unwrap().to_string());
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, total, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_page_response() {
    let db = setup_blog_db().await.expect("Failed to setup test database");
    let (factory, _dir) = blog_factory();
    let app = app(AppState { factory, db });

    let (status, total, body) = call(
        app,
        "/posts/list",
        json!({
            "page_limit": 2,
            "filters": [{ "field": "status", "operator": "eq", "value": { "from": "published" } }],
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(total.as_deref(), Some("3"));
    assert_eq!(body["total"], 3);
    assert_eq!(body["items"][0]["title"], "Async in practice");
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_input_is_bad_request() {
    let db = setup_blog_db().await.unwrap();
    let (factory, _dir) = blog_factory();
    let app = app(AppState { factory, db });

    let (status, total, body) = call(
        app,
        "/posts/list",
        json!({ "filters": [{ "field": "author", "operator": "eq", "value": { "from": "ann" } }] }),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(total.is_none());
    assert_eq!(body, json!({ "error": "Field \"author\" is not filterable" }));
}

#[tokio::test]
async fn test_missing_metadata_is_hidden_from_clients() {
    let db = setup_blog_db().await.unwrap();
    let (factory, _dir) = blog_factory();
    let app = app(AppState { factory, db });

    let (status, _, body) = call(app, "/comments/list", json!({})).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "List is not configured correctly" }));
}
