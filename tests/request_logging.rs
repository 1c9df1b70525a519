//! Request logging over real HTTP.

use std::collections::HashSet;
use std::time::Duration;

use http::StatusCode;
use noteworthy::{BoxError, Request, Response, Router};
use serde_json::json;

mod common;

use common::{Level, Recorder};

async fn echo_id(req: Request) -> String {
    req.request_id().unwrap_or_default().to_owned()
}

async fn created(_req: Request) -> Response {
    Response::builder()
        .status(StatusCode::CREATED)
        .json(br#"{"id":7}"#.to_vec())
}

async fn broken(_req: Request) -> Result<Response, BoxError> {
    Err("connection pool exhausted".into())
}

fn app(rec: &Recorder) -> Router {
    let logging = rec.logging();
    Router::new()
        .post("/api/notes", logging.wrap(created))
        .get("/api/whoami", logging.wrap(echo_id))
        .get("/api/broken", logging.wrap(broken))
        .get("/api/unlogged", broken)
}

#[tokio::test]
async fn response_id_matches_every_log_entry() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;

    let res = common::client()
        .post(server.url("/api/notes"))
        .header("x-forwarded-for", "1.1.1.1, 2.2.2.2")
        .header("user-agent", "integration-test")
        .header("referer", "http://localhost/notes")
        .json(&json!({"title": "hello"}))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::CREATED);
    let id = res.headers()["x-request-id"].to_str().unwrap().to_owned();
    assert_eq!(id.len(), 32);

    let entries = rec.for_request(&id);
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.level == Level::Info));
    assert!(entries.iter().all(|e| e.fields["requestId"] == id.as_str()));

    let request = &entries[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/api/notes");
    assert_eq!(request.message, "Incoming POST request to /api/notes");
    assert_eq!(request.fields["clientIP"], "1.1.1.1");
    assert_eq!(request.fields["userAgent"], "integration-test");
    assert_eq!(request.fields["referrer"], "http://localhost/notes");
    assert_eq!(request.fields["contentType"], "application/json");
    assert_eq!(request.fields["url"], format!("http://{}/api/notes", server.addr));

    let response = &entries[1];
    assert!(response.message.starts_with("Response 201 sent in "));
    assert_eq!(response.fields["statusCode"], 201);
    assert_eq!(response.fields["contentType"], "application/json");
    assert_eq!(response.fields["contentLength"], 8);
}

#[tokio::test]
async fn handler_and_client_see_the_same_id() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;

    let res = common::client().get(server.url("/api/whoami")).send().await.unwrap();
    let header = res.headers()["x-request-id"].to_str().unwrap().to_owned();
    let body = res.text().await.unwrap();

    assert_eq!(body, header);
}

#[tokio::test]
async fn client_supplied_id_is_not_trusted() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;

    let res = common::client()
        .get(server.url("/api/whoami"))
        .header("x-request-id", "spoofed")
        .send()
        .await
        .unwrap();

    assert_ne!(res.headers()["x-request-id"], "spoofed");
    assert_ne!(res.text().await.unwrap(), "spoofed");
}

#[tokio::test]
async fn failure_is_logged_once_and_hidden_from_the_client() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;

    let res = common::client().get(server.url("/api/broken")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let id = res.headers()["x-request-id"].to_str().unwrap().to_owned();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "Internal server error"}));

    let entries = rec.for_request(&id);
    let errors: Vec<_> = entries.iter().filter(|e| e.level == Level::Error).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].fields["error"]["message"], "connection pool exhausted");
    assert_eq!(errors[0].fields["method"], "GET");
    assert!(errors[0].fields["duration"].is_u64());

    let info: Vec<_> = entries.iter().filter(|e| e.level == Level::Info).collect();
    assert_eq!(info.len(), 1, "only the request entry");
}

#[tokio::test]
async fn unwrapped_failure_is_still_a_generic_500() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;

    let res = common::client().get(server.url("/api/unlogged")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.headers().get("x-request-id").is_none());
    assert_eq!(res.text().await.unwrap(), r#"{"error":"Internal server error"}"#);
    assert!(rec.entries().is_empty());
}

#[tokio::test]
async fn concurrent_requests_get_distinct_ids() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;
    let client = common::client();

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..16 {
        let client = client.clone();
        let url = server.url("/api/whoami");
        tasks.spawn(async move {
            let res = client.get(url).send().await.unwrap();
            res.headers()["x-request-id"].to_str().unwrap().to_owned()
        });
    }

    let mut ids = HashSet::new();
    while let Some(id) = tasks.join_next().await {
        ids.insert(id.unwrap());
    }
    assert_eq!(ids.len(), 16);

    for id in &ids {
        let entries = rec.for_request(id);
        assert_eq!(entries.len(), 2, "one request and one response entry for {id}");
    }
}

#[tokio::test]
async fn router_wide_logging_covers_every_route() {
    let rec = Recorder::default();
    let router = Router::new()
        .get("/a", |_req: Request| async { "a" })
        .with_request_logging(rec.logging())
        .get("/b", |_req: Request| async { "b" });
    let server = common::spawn(router).await;
    let client = common::client();

    for path in ["/a", "/b"] {
        let res = client.get(server.url(path)).send().await.unwrap();
        assert!(res.headers().contains_key("x-request-id"), "{path}");
    }
    assert_eq!(rec.entries().len(), 4);
}

#[tokio::test]
async fn unknown_route_is_404_and_server_drains_on_shutdown() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;

    let res = common::client().get(server.url("/nope")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    drop(res);

    server.shutdown.send(()).unwrap();
    assert!(server.handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn shutdown_closes_idle_keep_alive_connections() {
    let rec = Recorder::default();
    let server = common::spawn(app(&rec)).await;
    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    // Read the whole body so the connection goes back to the pool.
    let res = client.get(server.url("/api/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.text().await.unwrap();

    server.shutdown.send(()).unwrap();
    let stopped = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server stops while the client still holds a pooled connection");
    assert!(stopped.unwrap().is_ok());
    drop(client);
}
