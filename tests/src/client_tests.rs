use crate::{client, server};
use berapi::{
    middleware::{ApiKeyAuth, BearerAuth, DefaultHeader, HookMiddleware, RequestLogger},
    Client, Error, HyperTransport, Settings, TransportError,
};
use serde_json::json;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

#[tokio::test]
async fn fetches_and_asserts_a_user() {
    let api = client().build().unwrap();

    let response = api
        .get("/users/1")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_content_type("application/json")
        .assert_json_path("name", "Leanne Graham")
        .assert_json_path("address.geo.lat", "-37.3159")
        .assert_has_key("email");

    assert_eq!(response.request().url.path(), "/users/1");
    assert!(response.elapsed() > Duration::ZERO);
}

#[tokio::test]
async fn lists_are_not_empty() {
    let api = client().build().unwrap();

    let response = api.get("users").send().await.unwrap().assert_list_not_empty();

    assert_eq!(response.get("1.name"), Some(&json!("Ervin Howell")));
}

#[tokio::test]
async fn query_parameters_are_encoded() {
    let api = client().build().unwrap();

    api.get("/query")
        .query("q", "rust lang")
        .query("page", 2)
        .send()
        .await
        .unwrap()
        .assert_json_path("query", "q=rust+lang&page=2");
}

#[tokio::test]
async fn auth_and_default_headers_reach_the_server() {
    let api = client()
        .header("X-Custom", "default")
        .middleware(BearerAuth::new("test-token-123"))
        .middleware(ApiKeyAuth::new("key-456").header_name("X-Service-Key"))
        .middleware(DefaultHeader::new("User-Agent", "berapi-tests"))
        .build()
        .unwrap();

    api.get("/headers")
        .header("x-custom", "caller")
        .send()
        .await
        .unwrap()
        .assert_json_path("headers.authorization", "Bearer test-token-123")
        .assert_json_path("headers.x-service-key", "key-456")
        .assert_json_path("headers.user-agent", "berapi-tests")
        .assert_json_path("headers.x-custom", "caller");
}

#[tokio::test]
async fn json_and_form_bodies_set_their_content_type() {
    let api = client().middleware(RequestLogger::new().with_bodies()).build().unwrap();

    api.post("/posts")
        .json(&json!({"title": "Test", "userId": 1}))
        .send()
        .await
        .unwrap()
        .assert_status(201)
        .assert_json_path("content_type", "application/json")
        .assert_json_path("data.title", "Test");

    api.put("/posts/1")
        .form([("field1", "value1")])
        .send()
        .await
        .unwrap()
        .assert_2xx()
        .assert_json_path("content_type", "application/x-www-form-urlencoded")
        .assert_json_path("data", "field1=value1");
}

#[tokio::test]
async fn status_classes() {
    let api = client().build().unwrap();

    api.get("/status/404").send().await.unwrap().assert_4xx();
    api.get("/status/503").send().await.unwrap().assert_5xx();
    api.delete("/posts/1").send().await.unwrap().assert_status(204);
}

#[tokio::test]
#[should_panic(expected = "expected status 200, got 500")]
async fn failed_assertion_panics_with_the_status() {
    let api = client().build().unwrap();

    api.get("/status/500").send().await.unwrap().assert_status(200);
}

#[tokio::test]
async fn non_json_body_is_reported() {
    let api = client().build().unwrap();

    let response = api
        .get("/html")
        .send()
        .await
        .unwrap()
        .assert_contains("Hello")
        .assert_not_contains("Goodbye");

    assert!(matches!(response.json(), Err(Error::InvalidJson(_))));
}

#[tokio::test]
async fn slow_responses_time_out() {
    let api = client().timeout(Duration::from_millis(100)).build().unwrap();

    let error = api.get("/slow").send().await.unwrap_err();

    assert!(error.is_timeout(), "unexpected error: {}", error);
}

#[tokio::test]
async fn per_request_timeout_overrides_the_default() {
    let api = client().timeout(Duration::from_millis(50)).build().unwrap();

    api.get("/slow")
        .timeout(server::SLOW_DELAY * 5)
        .send()
        .await
        .unwrap()
        .assert_json_path("slow", true);
}

#[tokio::test]
async fn unreachable_host_runs_error_hooks() {
    let errors = Arc::new(Mutex::new(Vec::new()));
    let seen = errors.clone();
    let api = Client::builder()
        .base_url("http://127.0.0.1:1")
        .middleware(
            HookMiddleware::new("error-recorder")
                .error_hook(move |error, request| {
                    seen.lock().unwrap().push(format!("{} {}", request.url.path(), error));
                })
                .response_hook(|_| panic!("no response expected")),
        )
        .build()
        .unwrap();

    let error = api.get("/users").send().await.unwrap_err();

    assert!(error.is_transport());
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("/users "));
}

#[tokio::test]
async fn client_from_settings() {
    let base_url = server::base_url();
    let settings = Settings::from_lookup(|key| match key {
        "BERAPI_BASE_URL" => Some(base_url.clone()),
        "BERAPI_TIMEOUT" => Some("5".to_owned()),
        _ => None,
    })
    .unwrap();

    let api = Client::new(settings).unwrap();

    assert_eq!(api.settings().timeout(), Duration::from_secs(5));
    assert!(api.tracker().is_none());
    api.get("/users/1").send().await.unwrap().assert_2xx();
}

#[tokio::test]
async fn redirects_are_followed() {
    let api = client().build().unwrap();

    let response = api.get("/redirect").send().await.unwrap().assert_2xx();
    assert_eq!(response.get("name"), Some(&json!("Leanne Graham")));

    api.get("/redirect/3")
        .send()
        .await
        .unwrap()
        .assert_status(200)
        .assert_json_path("id", 1);
}

#[tokio::test]
async fn see_other_is_fetched_with_get() {
    let api = client().build().unwrap();

    api.post("/see-other")
        .json(&json!({"title": "Test"}))
        .send()
        .await
        .unwrap()
        .assert_json_path("method", "GET")
        .assert_json_path("body", "");
}

#[tokio::test]
async fn temporary_redirect_keeps_method_and_body() {
    let api = client().build().unwrap();

    api.post("/temporary")
        .text("payload")
        .send()
        .await
        .unwrap()
        .assert_json_path("method", "POST")
        .assert_json_path("body", "payload");
}

#[tokio::test]
async fn redirect_loops_are_cut_off() {
    let api = client()
        .transport(HyperTransport::new().max_redirects(3))
        .build()
        .unwrap();

    let error = api.get("/loop").send().await.unwrap_err();

    assert!(matches!(error, Error::Transport(TransportError::TooManyRedirects(3))));
}

#[tokio::test]
async fn redirects_can_be_disabled() {
    let api = client()
        .transport(HyperTransport::new().max_redirects(0))
        .build()
        .unwrap();

    api.get("/redirect")
        .send()
        .await
        .unwrap()
        .assert_3xx()
        .assert_header("location", "/users/1");
}
