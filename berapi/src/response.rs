//! Assertion-capable wrapper returned by [`RequestBuilder::send`](crate::RequestBuilder::send).
//!
//! Every `assert_*` method panics with a message naming the request when the
//! check fails, and otherwise returns the response so checks can be chained:
//!
//! ```no_run
//! # async fn run(api: berapi::Client) -> berapi::Result<()> {
//! api.get("/users/1")
//!     .send()
//!     .await?
//!     .assert_2xx()
//!     .assert_json_path("address.city", "Gwenborough");
//! # Ok(())
//! # }
//! ```

use crate::{
    context::{Headers, RequestContext, ResponseContext},
    error::{Error, Result},
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::{ops::RangeInclusive, time::Duration};

#[derive(Debug)]
pub struct Response {
    context: ResponseContext,
}

impl Response {
    pub(crate) fn new(context: ResponseContext) -> Self {
        Self { context }
    }

    pub fn status(&self) -> u16 {
        self.context.status
    }

    pub fn headers(&self) -> &Headers {
        &self.context.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.context.headers.get(name)
    }

    pub fn bytes(&self) -> &Bytes {
        self.context.body()
    }

    /// Body decoded as UTF-8, with invalid sequences replaced.
    pub fn text(&self) -> String {
        self.context.text()
    }

    pub fn json(&self) -> Result<&Value> {
        self.context
            .decoded_json()
            .as_ref()
            .map_err(|reason| Error::InvalidJson(reason.clone()))
    }

    pub fn json_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(self.context.body())?)
    }

    /// Looks up a dot-separated path such as `address.geo.lat` or `items.0.id`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(self.context.json()?, path)
    }

    pub fn elapsed(&self) -> Duration {
        self.context.elapsed
    }

    pub fn request(&self) -> &RequestContext {
        self.context.request()
    }

    pub fn context(&self) -> &ResponseContext {
        &self.context
    }

    pub fn into_context(self) -> ResponseContext {
        self.context
    }

    #[track_caller]
    pub fn assert_status(self, expected: u16) -> Self {
        if self.status() != expected {
            self.fail(format!("expected status {}, got {}", expected, self.status()));
        }
        self
    }

    #[track_caller]
    pub fn assert_2xx(self) -> Self {
        self.assert_status_in(200..=299)
    }

    #[track_caller]
    pub fn assert_3xx(self) -> Self {
        self.assert_status_in(300..=399)
    }

    #[track_caller]
    pub fn assert_4xx(self) -> Self {
        self.assert_status_in(400..=499)
    }

    #[track_caller]
    pub fn assert_5xx(self) -> Self {
        self.assert_status_in(500..=599)
    }

    #[track_caller]
    pub fn assert_header(self, name: &str, expected: &str) -> Self {
        match self.header(name) {
            Some(value) if value == expected => {}
            Some(value) => self.fail(format!(
                "expected header `{}` to be `{}`, got `{}`",
                name, expected, value
            )),
            None => self.fail(format!("expected header `{}`, but it is missing", name)),
        }
        self
    }

    #[track_caller]
    pub fn assert_header_exists(self, name: &str) -> Self {
        if self.header(name).is_none() {
            self.fail(format!("expected header `{}`, but it is missing", name));
        }
        self
    }

    #[track_caller]
    pub fn assert_content_type(self, expected: &str) -> Self {
        match self.header("content-type") {
            Some(value) if value.contains(expected) => {}
            other => self.fail(format!(
                "expected content type containing `{}`, got {:?}",
                expected, other
            )),
        }
        self
    }

    #[track_caller]
    pub fn assert_contains(self, text: &str) -> Self {
        if !self.text().contains(text) {
            self.fail(format!("expected body to contain `{}`", text));
        }
        self
    }

    #[track_caller]
    pub fn assert_not_contains(self, text: &str) -> Self {
        if self.text().contains(text) {
            self.fail(format!("expected body not to contain `{}`", text));
        }
        self
    }

    #[track_caller]
    pub fn assert_json_path<V: Into<Value>>(self, path: &str, expected: V) -> Self {
        let expected = expected.into();
        match self.get(path) {
            Some(actual) if *actual == expected => {}
            Some(actual) => self.fail(format!(
                "expected `{}` to be {}, got {}",
                path, expected, actual
            )),
            None => self.fail(format!("path `{}` not found in response", path)),
        }
        self
    }

    #[track_caller]
    pub fn assert_has_key(self, path: &str) -> Self {
        if self.get(path).is_none() {
            self.fail(format!("path `{}` not found in response", path));
        }
        self
    }

    #[track_caller]
    pub fn assert_list_not_empty(self) -> Self {
        match self.json() {
            Ok(Value::Array(items)) if !items.is_empty() => {}
            Ok(Value::Array(_)) => self.fail("expected a non-empty list, got an empty one".into()),
            Ok(other) => self.fail(format!("expected a list, got {}", other)),
            Err(e) => self.fail(e.to_string()),
        }
        self
    }

    #[track_caller]
    pub fn assert_response_time(self, max: Duration) -> Self {
        if self.elapsed() >= max {
            self.fail(format!(
                "expected response within {:?}, took {:?}",
                max,
                self.elapsed()
            ));
        }
        self
    }

    #[track_caller]
    fn assert_status_in(self, range: RangeInclusive<u16>) -> Self {
        if !range.contains(&self.status()) {
            self.fail(format!(
                "expected status between {} and {}, got {}",
                range.start(),
                range.end(),
                self.status()
            ));
        }
        self
    }

    #[track_caller]
    fn fail(&self, message: String) -> ! {
        let request = self.request();
        panic!(
            "{} {}: {}\nresponse body: {}",
            request.method,
            request.url,
            message,
            self.text()
        );
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
