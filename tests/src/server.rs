//! Local HTTP server answering a handful of fixed routes, shared by every test
//! in this crate.
//!
//! `/redirect/{n}` redirects `n` times before landing on `/users/1`, `/loop`
//! redirects to itself.

use hyper::{
    body,
    header::{CONTENT_TYPE, LOCATION},
    service::{make_service_fn, service_fn},
    Body, Method, Request, Response, Server, StatusCode,
};
use serde_json::{json, Map, Value};
use std::{
    convert::Infallible,
    net::SocketAddr,
    sync::{mpsc, OnceLock},
    thread,
    time::Duration,
};
use tokio::runtime::Runtime;

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(800);

/// Bytes served by `/binary`; not valid UTF-8.
pub const BINARY_BODY: &[u8] = &[0xff, 0xfe, 0x00, 0x42, 0x80];

static SERVER_ADDR: OnceLock<SocketAddr> = OnceLock::new();

/// Base URL of the server, starting it on first use.
pub fn base_url() -> String {
    format!("http://{}", start_once())
}

fn start_once() -> SocketAddr {
    *SERVER_ADDR.get_or_init(|| {
        let (sender, receiver) = mpsc::channel();

        thread::spawn(move || {
            let runtime = Runtime::new().expect("test server runtime");
            runtime.block_on(async move {
                let addr = SocketAddr::from(([127, 0, 0, 1], 0));
                let server = Server::bind(&addr).serve(make_service_fn(|_| async {
                    Ok::<_, Infallible>(service_fn(handle_request))
                }));

                sender.send(server.local_addr()).expect("report test server address");

                if let Err(e) = server.await {
                    eprintln!("Test server error: {}", e);
                }
            });
        });

        receiver.recv().expect("test server did not start")
    })
}

async fn handle_request(request: Request<Body>) -> Result<Response<Body>, Infallible> {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let query = request.uri().query().unwrap_or_default().to_owned();
    let headers: Map<String, Value> = request
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                Value::from(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let payload = body::to_bytes(request.into_body()).await.unwrap_or_default();

    let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
    let response = match (&method, segments.as_slice()) {
        (&Method::GET, ["users"]) => json_response(
            StatusCode::OK,
            json!([
                {"id": 1, "name": "Leanne Graham"},
                {"id": 2, "name": "Ervin Howell"}
            ]),
        ),
        (&Method::GET, ["users", "1"]) => json_response(
            StatusCode::OK,
            json!({
                "id": 1,
                "name": "Leanne Graham",
                "email": "Sincere@april.biz",
                "address": {"city": "Gwenborough", "geo": {"lat": "-37.3159"}}
            }),
        ),
        (_, ["headers"]) => json_response(StatusCode::OK, json!({ "headers": headers })),
        (_, ["query"]) => json_response(StatusCode::OK, json!({ "query": query })),
        (_, ["status", code]) => {
            let status = code
                .parse()
                .ok()
                .and_then(|code| StatusCode::from_u16(code).ok())
                .unwrap_or(StatusCode::BAD_REQUEST);
            json_response(status, json!({ "status": status.as_u16() }))
        }
        (&Method::POST, ["posts"]) | (&Method::PUT, ["posts", _]) => {
            let data = serde_json::from_slice::<Value>(&payload)
                .unwrap_or_else(|_| Value::from(String::from_utf8_lossy(&payload).into_owned()));
            let status = if method == Method::POST {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            json_response(
                status,
                json!({ "id": 101, "method": method.as_str(), "content_type": content_type, "data": data }),
            )
        }
        (&Method::DELETE, ["posts", _]) => empty_response(StatusCode::NO_CONTENT),
        (_, ["binary"]) => simple_response(StatusCode::OK, "application/octet-stream", BINARY_BODY),
        (_, ["html"]) => simple_response(
            StatusCode::OK,
            "text/html; charset=utf-8",
            b"<html><body>Hello</body></html>",
        ),
        (_, ["redirect"]) => redirect_response(StatusCode::FOUND, "/users/1"),
        (_, ["redirect", hops]) => match hops.parse::<u32>() {
            Ok(hops) if hops > 1 => {
                redirect_response(StatusCode::FOUND, &format!("/redirect/{}", hops - 1))
            }
            _ => redirect_response(StatusCode::FOUND, "/users/1"),
        },
        (_, ["loop"]) => redirect_response(StatusCode::FOUND, "/loop"),
        (_, ["see-other"]) => redirect_response(StatusCode::SEE_OTHER, "/method"),
        (_, ["temporary"]) => redirect_response(StatusCode::TEMPORARY_REDIRECT, "method"),
        (_, ["method"]) => json_response(
            StatusCode::OK,
            json!({
                "method": method.as_str(),
                "body": String::from_utf8_lossy(&payload),
            }),
        ),
        (_, ["slow"]) => {
            tokio::time::sleep(SLOW_DELAY).await;
            json_response(StatusCode::OK, json!({ "slow": true }))
        }
        _ => json_response(StatusCode::NOT_FOUND, json!({ "error": "not found" })),
    };

    Ok(response)
}

fn json_response(status: StatusCode, body: Value) -> Response<Body> {
    simple_response(status, "application/json", body.to_string().as_bytes())
}

fn simple_response(status: StatusCode, content_type: &str, body: &[u8]) -> Response<Body> {
    let mut response = Response::new(Body::from(body.to_vec()));
    *response.status_mut() = status;
    if let Ok(value) = content_type.parse() {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

fn redirect_response(status: StatusCode, location: &str) -> Response<Body> {
    let mut response = empty_response(status);
    if let Ok(value) = location.parse() {
        response.headers_mut().insert(LOCATION, value);
    }
    response
}

fn empty_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    response
}
