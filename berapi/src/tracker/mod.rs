//! Bounded history of recent request/response exchanges, kept for failure
//! diagnostics.
//!
//! The tracker is a FIFO ring buffer: once `capacity` exchanges are stored,
//! recording a new request evicts the oldest one, whether or not its response
//! has arrived. Header values whose names appear in the mask list are replaced
//! with [`MASKED_PLACEHOLDER`] before anything is stored.
//!
//! Nothing here ever fails. Bodies that are not UTF-8 are stored as
//! [`BINARY_PLACEHOLDER`], and completing an exchange that no longer exists is
//! a no-op, so diagnostics can never mask the failure being diagnosed.

pub mod render;

use crate::context::{Headers, RequestBody};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 10;
pub const MASKED_PLACEHOLDER: &str = "***MASKED***";
pub const BINARY_PLACEHOLDER: &str = "<binary data>";
/// Response bodies are cut to this many characters.
pub const MAX_BODY_CHARS: usize = 2000;
const TRUNCATED_SUFFIX: &str = "...(truncated)";

/// Sequence number of an exchange within one tracker.
pub type ExchangeId = u64;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TrackerConfig {
    pub capacity: usize,
    pub mask_headers: Vec<String>,
}

impl TrackerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn mask_header<S: Into<String>>(mut self, name: S) -> Self {
        self.mask_headers.push(name.into());
        self
    }

    pub fn mask_headers<S: Into<String>, I: IntoIterator<Item = S>>(mut self, names: I) -> Self {
        self.mask_headers.extend(names.into_iter().map(Into::into));
        self
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            mask_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSnapshot {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Headers,
    pub body: Option<String>,
    pub elapsed: Option<Duration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedExchange {
    pub id: ExchangeId,
    /// Request id the exchange was recorded under, if any.
    pub correlation: Option<Uuid>,
    pub request: RequestSnapshot,
    pub response: Option<ResponseSnapshot>,
    /// Transport failure that ended the exchange without a response.
    pub error: Option<String>,
}

impl TrackedExchange {
    /// Still waiting for either a response or a transport error.
    pub fn is_open(&self) -> bool {
        self.response.is_none() && self.error.is_none()
    }

    pub fn status(&self) -> Option<u16> {
        self.response.as_ref().map(|response| response.status)
    }
}

/// Cosmetic grouping of status codes used by the reports.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum StatusCategory {
    Success,
    ClientError,
    ServerError,
    Neutral,
}

impl StatusCategory {
    pub fn from_status(status: u16) -> Self {
        match status {
            200..=299 => StatusCategory::Success,
            400..=499 => StatusCategory::ClientError,
            500..=599 => StatusCategory::ServerError,
            _ => StatusCategory::Neutral,
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StatusCategory::Success => "success",
            StatusCategory::ClientError => "client-error",
            StatusCategory::ServerError => "server-error",
            StatusCategory::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
struct Buffer {
    exchanges: VecDeque<TrackedExchange>,
    next_id: ExchangeId,
}

#[derive(Debug)]
pub struct Tracker {
    buffer: Mutex<Buffer>,
    capacity: usize,
    masked: HashSet<String>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(TrackerConfig::new().capacity(capacity))
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            buffer: Mutex::new(Buffer::default()),
            capacity: config.capacity.max(1),
            masked: config
                .mask_headers
                .iter()
                .map(|name| name.to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.buffer().exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer().exchanges.is_empty()
    }

    /// Snapshot of the buffer, oldest first.
    pub fn exchanges(&self) -> Vec<TrackedExchange> {
        self.buffer().exchanges.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.buffer().exchanges.clear();
    }

    /// Records a request whose response is still pending.
    pub fn track_request(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        body: Option<&RequestBody>,
    ) -> ExchangeId {
        self.push(None, method, url, headers, body)
    }

    /// Like [`track_request`](Self::track_request), remembering `correlation`
    /// so the response can be matched without relying on ordering.
    pub fn track_request_for(
        &self,
        correlation: Uuid,
        method: &str,
        url: &str,
        headers: &Headers,
        body: Option<&RequestBody>,
    ) -> ExchangeId {
        self.push(Some(correlation), method, url, headers, body)
    }

    /// Completes the most recent open exchange. Does nothing if there is none.
    pub fn track_response(
        &self,
        status: u16,
        headers: &Headers,
        body: &[u8],
        elapsed: Option<Duration>,
    ) {
        let snapshot = self.response_snapshot(status, headers, body, elapsed);
        let mut buffer = self.buffer();

        if let Some(exchange) = buffer.exchanges.iter_mut().rev().find(|e| e.is_open()) {
            exchange.response = Some(snapshot);
        }
    }

    /// Completes the open exchange recorded under `correlation`, if it is still buffered.
    pub fn track_response_for(
        &self,
        correlation: Uuid,
        status: u16,
        headers: &Headers,
        body: &[u8],
        elapsed: Option<Duration>,
    ) {
        let snapshot = self.response_snapshot(status, headers, body, elapsed);

        if let Some(exchange) = self.buffer().find_open(correlation) {
            exchange.response = Some(snapshot);
        }
    }

    /// Marks the open exchange recorded under `correlation` as failed.
    pub fn track_error_for<S: Into<String>>(&self, correlation: Uuid, message: S) {
        if let Some(exchange) = self.buffer().find_open(correlation) {
            exchange.error = Some(message.into());
        }
    }

    /// Copy of `headers` with every masked header replaced by [`MASKED_PLACEHOLDER`].
    pub fn redact(&self, headers: &Headers) -> Headers {
        headers
            .iter()
            .map(|(name, value)| {
                if self.masked.contains(&name.to_ascii_lowercase()) {
                    (name, MASKED_PLACEHOLDER)
                } else {
                    (name, value)
                }
            })
            .collect()
    }

    pub fn to_text(&self) -> String {
        render::to_text(&self.exchanges())
    }

    /// Markdown report, one section per exchange.
    pub fn to_report(&self) -> String {
        render::to_markdown(&self.exchanges())
    }

    pub fn to_html(&self) -> String {
        render::to_html(&self.exchanges())
    }

    fn push(
        &self,
        correlation: Option<Uuid>,
        method: &str,
        url: &str,
        headers: &Headers,
        body: Option<&RequestBody>,
    ) -> ExchangeId {
        let request = RequestSnapshot {
            method: method.to_owned(),
            url: url.to_owned(),
            headers: self.redact(headers),
            body: body.and_then(request_body_text),
            timestamp: Utc::now(),
        };

        let mut buffer = self.buffer();
        while buffer.exchanges.len() >= self.capacity {
            buffer.exchanges.pop_front();
        }

        let id = buffer.next_id;
        buffer.next_id += 1;
        buffer.exchanges.push_back(TrackedExchange {
            id,
            correlation,
            request,
            response: None,
            error: None,
        });

        id
    }

    fn response_snapshot(
        &self,
        status: u16,
        headers: &Headers,
        body: &[u8],
        elapsed: Option<Duration>,
    ) -> ResponseSnapshot {
        ResponseSnapshot {
            status,
            headers: self.redact(headers),
            body: decode_body(body).map(truncate_body),
            elapsed,
        }
    }

    // A test that panicked while holding the lock must not take the
    // diagnostics down with it.
    fn buffer(&self) -> MutexGuard<'_, Buffer> {
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Buffer {
    fn find_open(&mut self, correlation: Uuid) -> Option<&mut TrackedExchange> {
        self.exchanges
            .iter_mut()
            .rev()
            .find(|e| e.correlation == Some(correlation) && e.is_open())
    }
}

fn request_body_text(body: &RequestBody) -> Option<String> {
    match body {
        RequestBody::Text(text) => Some(text.clone()),
        RequestBody::Json(value) => Some(value.to_string()),
        RequestBody::Bytes(_) | RequestBody::Form(_) => decode_body(&body.to_bytes()),
    }
}

/// Text form of a body, `None` when empty.
fn decode_body(body: &[u8]) -> Option<String> {
    if body.is_empty() {
        return None;
    }

    match std::str::from_utf8(body) {
        Ok(text) => Some(text.to_owned()),
        Err(_) => Some(BINARY_PLACEHOLDER.to_owned()),
    }
}

fn truncate_body(body: String) -> String {
    match body.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => format!("{}{}", &body[..cut], TRUNCATED_SUFFIX),
        None => body,
    }
}
