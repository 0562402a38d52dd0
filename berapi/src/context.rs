use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::Method;
use indexmap::IndexMap;
use serde_json::Value;
use std::{
    fmt,
    sync::{Arc, OnceLock},
    time::Duration,
};
use url::Url;
use uuid::Uuid;

/// Header collection that keeps insertion order and the caller's spelling,
/// while matching names case-insensitively.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: IndexMap<String, (String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name` to `value`. An existing header keeps its position but takes the new spelling.
    pub fn insert<S1: Into<String>, S2: Into<String>>(&mut self, name: S1, value: S2) {
        let name = name.into();
        self.entries
            .insert(name.to_ascii_lowercase(), (name, value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|(_, value)| value)
    }

    /// Applies `other` on top of these headers; `other` wins on collisions.
    pub fn merge(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        headers.extend(iter);
        headers
    }
}

impl<K: Into<String>, V: Into<String>> Extend<(K, V)> for Headers {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

/// Payload attached to a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Bytes(Bytes),
    Json(Value),
    Form(Vec<(String, String)>),
}

impl RequestBody {
    /// The content type implied by the payload, used when the caller sets none.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            RequestBody::Json(_) => Some("application/json"),
            RequestBody::Form(_) => Some("application/x-www-form-urlencoded"),
            RequestBody::Text(_) => Some("text/plain; charset=utf-8"),
            RequestBody::Bytes(_) => None,
        }
    }

    /// Wire encoding of the payload.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            RequestBody::Text(text) => Bytes::from(text.clone()),
            RequestBody::Bytes(bytes) => bytes.clone(),
            RequestBody::Json(value) => Bytes::from(value.to_string()),
            RequestBody::Form(fields) => Bytes::from(
                url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields)
                    .finish(),
            ),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        RequestBody::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        RequestBody::Text(text.to_owned())
    }
}

impl From<Value> for RequestBody {
    fn from(value: Value) -> Self {
        RequestBody::Json(value)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        RequestBody::Bytes(bytes.into())
    }
}

/// One outgoing request as seen by middleware before it is sent.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: Uuid,
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<RequestBody>,
    pub timeout: Duration,
    created_at: DateTime<Utc>,
}

impl RequestContext {
    pub fn new(method: Method, url: Url, timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            url,
            headers: Headers::new(),
            body: None,
            timeout,
            created_at: Utc::now(),
        }
    }

    /// Correlation id shared by every hook invoked for this request.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the request was built, not when it reached the wire.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A received response paired with the request that produced it.
#[derive(Debug)]
pub struct ResponseContext {
    pub status: u16,
    pub headers: Headers,
    body: Bytes,
    json: OnceLock<Result<Value, String>>,
    pub elapsed: Duration,
    request: Arc<RequestContext>,
}

impl ResponseContext {
    pub fn new(
        request: Arc<RequestContext>,
        status: u16,
        headers: Headers,
        body: Bytes,
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            json: OnceLock::new(),
            elapsed,
            request,
        }
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn set_body<B: Into<Bytes>>(&mut self, body: B) {
        self.body = body.into();
        self.json = OnceLock::new();
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// The body decoded as JSON on first access; `None` if it is not JSON.
    pub fn json(&self) -> Option<&Value> {
        self.decoded_json().as_ref().ok()
    }

    pub(crate) fn decoded_json(&self) -> &Result<Value, String> {
        self.json
            .get_or_init(|| serde_json::from_slice(&self.body).map_err(|e| e.to_string()))
    }
}
