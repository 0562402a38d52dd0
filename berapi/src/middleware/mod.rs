//! Cross-cutting request/response logic run by the [`Pipeline`](crate::Pipeline).
//!
//! A middleware implements any subset of three hooks. Hooks it leaves out
//! fall back to the trait's no-op defaults.

mod auth;
mod logging;
mod tracking;

pub use auth::{ApiKeyAuth, BearerAuth, DefaultHeader};
pub use logging::RequestLogger;
pub use tracking::TrackingMiddleware;

use crate::{
    context::{RequestContext, ResponseContext},
    error::{BoxError, TransportError},
};
use std::fmt;

pub trait Middleware: Send + Sync {
    /// Name used when reporting a failure of this middleware.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Runs before the request is sent. An error aborts the request.
    fn on_request(&self, _request: &mut RequestContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs after a response was received. `response.request()` is the sent request.
    fn on_response(&self, _response: &mut ResponseContext) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs when the transport failed. Side effects only.
    fn on_error(&self, _error: &TransportError, _request: &RequestContext) {}
}

type RequestHook = Box<dyn Fn(&mut RequestContext) -> Result<(), BoxError> + Send + Sync>;
type ResponseHook = Box<dyn Fn(&mut ResponseContext) -> Result<(), BoxError> + Send + Sync>;
type ErrorHook = Box<dyn Fn(&TransportError, &RequestContext) + Send + Sync>;

/// Middleware assembled from closures. An unset slot is a no-op.
///
/// ```
/// use berapi::middleware::HookMiddleware;
///
/// let trace = HookMiddleware::new("trace").request_hook(|request| {
///     request.headers.insert("X-Trace", "1");
///     Ok(())
/// });
/// ```
pub struct HookMiddleware {
    name: String,
    on_request: Option<RequestHook>,
    on_response: Option<ResponseHook>,
    on_error: Option<ErrorHook>,
}

impl HookMiddleware {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            on_request: None,
            on_response: None,
            on_error: None,
        }
    }

    pub fn request_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_request = Some(Box::new(hook));
        self
    }

    pub fn response_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut ResponseContext) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.on_response = Some(Box::new(hook));
        self
    }

    pub fn error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&TransportError, &RequestContext) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(hook));
        self
    }
}

impl Middleware for HookMiddleware {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_request(&self, request: &mut RequestContext) -> Result<(), BoxError> {
        match &self.on_request {
            Some(hook) => hook(request),
            None => Ok(()),
        }
    }

    fn on_response(&self, response: &mut ResponseContext) -> Result<(), BoxError> {
        match &self.on_response {
            Some(hook) => hook(response),
            None => Ok(()),
        }
    }

    fn on_error(&self, error: &TransportError, request: &RequestContext) {
        if let Some(hook) = &self.on_error {
            hook(error, request);
        }
    }
}

impl fmt::Debug for HookMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookMiddleware")
            .field("name", &self.name)
            .field("on_request", &self.on_request.is_some())
            .field("on_response", &self.on_response.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
