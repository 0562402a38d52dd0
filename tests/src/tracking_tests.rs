use crate::{client, server};
use berapi::{
    middleware::BearerAuth,
    tracker::{BINARY_PLACEHOLDER, MASKED_PLACEHOLDER},
    Client, Tracker, TrackerConfig,
};
use serde_json::json;
use std::sync::Arc;

fn masked_tracker() -> Arc<Tracker> {
    Arc::new(Tracker::with_config(
        TrackerConfig::new().mask_headers(["Authorization", "X-API-Key"]),
    ))
}

#[tokio::test]
async fn records_requests_with_masked_headers() {
    let tracker = masked_tracker();
    let api = client()
        .middleware(BearerAuth::new("secret-token"))
        .tracker(tracker.clone())
        .build()
        .unwrap();

    api.post("/posts")
        .header("X-API-Key", "secret-key")
        .header("X-Request-Id", "abc-123")
        .json(&json!({"title": "Test"}))
        .send()
        .await
        .unwrap()
        .assert_status(201);

    let exchanges = tracker.exchanges();
    assert_eq!(exchanges.len(), 1);
    let request = &exchanges[0].request;
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, format!("{}/posts", server::base_url()));
    assert_eq!(request.headers.get("authorization"), Some(MASKED_PLACEHOLDER));
    assert_eq!(request.headers.get("x-api-key"), Some(MASKED_PLACEHOLDER));
    assert_eq!(request.headers.get("x-request-id"), Some("abc-123"));
    assert_eq!(request.body.as_deref(), Some(r#"{"title":"Test"}"#));

    let response = exchanges[0].response.as_ref().unwrap();
    assert_eq!(response.status, 201);
    assert!(response.elapsed.is_some());
    assert!(response.body.as_ref().unwrap().contains("\"id\":101"));

    let text = tracker.to_text();
    assert!(!text.contains("secret-token"));
    assert!(!text.contains("secret-key"));
}

#[tokio::test]
async fn keeps_only_the_most_recent_exchanges() {
    let api = client()
        .tracking(TrackerConfig::new().capacity(3))
        .build()
        .unwrap();

    for code in [201, 202, 203, 204, 205] {
        api.get(&format!("/status/{}", code)).send().await.unwrap();
    }

    let statuses: Vec<_> = api
        .tracker()
        .unwrap()
        .exchanges()
        .iter()
        .map(|exchange| exchange.status())
        .collect();
    assert_eq!(statuses, vec![Some(203), Some(204), Some(205)]);
}

#[tokio::test]
async fn concurrent_requests_keep_their_responses() {
    let api = client().tracker(Arc::new(Tracker::new())).build().unwrap();

    let (slow, fast) = tokio::join!(api.get("/slow").send(), api.get("/status/404").send());
    slow.unwrap().assert_2xx();
    fast.unwrap().assert_4xx();

    let exchanges = api.tracker().unwrap().exchanges();
    assert_eq!(exchanges.len(), 2);
    for exchange in &exchanges {
        let expected = if exchange.request.url.ends_with("/slow") { 200 } else { 404 };
        assert_eq!(exchange.status(), Some(expected), "{}", exchange.request.url);
    }
}

#[tokio::test]
async fn binary_bodies_are_not_rendered() {
    let api = client().tracker(Arc::new(Tracker::new())).build().unwrap();

    let response = api.get("/binary").send().await.unwrap();
    assert_eq!(&response.bytes()[..], server::BINARY_BODY);

    let tracker = api.tracker().unwrap();
    let exchanges = tracker.exchanges();
    assert_eq!(
        exchanges[0].response.as_ref().unwrap().body.as_deref(),
        Some(BINARY_PLACEHOLDER)
    );
    assert!(tracker.to_text().contains(BINARY_PLACEHOLDER));
}

#[tokio::test]
async fn transport_failures_are_recorded() {
    let tracker = Arc::new(Tracker::new());
    let api = Client::builder()
        .base_url("http://127.0.0.1:1")
        .tracker(tracker.clone())
        .build()
        .unwrap();

    let error = api.get("/users").send().await.unwrap_err();

    let exchanges = tracker.exchanges();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].error.as_deref(), Some(error.to_string().as_str()));
    assert!(tracker.to_text().contains("error:"));
}

#[tokio::test]
async fn reports_describe_each_exchange() {
    let api = client().tracker(masked_tracker()).build().unwrap();

    api.get("/users/1").send().await.unwrap();
    api.get("/status/500").send().await.unwrap();

    let tracker = api.tracker().unwrap();
    let base_url = server::base_url();
    let markdown = tracker.to_report();
    assert!(markdown.contains(&format!("## Interaction 1: GET {}/users/1", base_url)));
    assert!(markdown.contains(&format!("## Interaction 2: GET {}/status/500", base_url)));

    let html = tracker.to_html();
    assert!(html.contains("/users/1"));
    assert!(html.contains("500"));

    tracker.clear();
    assert_eq!(tracker.to_text(), "No API requests tracked.");
}
