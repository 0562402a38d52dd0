use super::Middleware;
use crate::{
    context::{RequestContext, ResponseContext},
    error::{BoxError, TransportError},
    tracker::render,
};
use tracing::{debug, info, warn};

/// Logs every exchange through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    log_bodies: bool,
}

impl RequestLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log request and response bodies at `debug` level.
    pub fn with_bodies(mut self) -> Self {
        self.log_bodies = true;
        self
    }
}

impl Middleware for RequestLogger {
    fn name(&self) -> &str {
        "request-logger"
    }

    fn on_request(&self, request: &mut RequestContext) -> Result<(), BoxError> {
        info!(
            request_id = %request.id(),
            method = %request.method,
            url = %request.url,
            "sending request"
        );
        if self.log_bodies {
            if let Some(body) = &request.body {
                debug!(request_id = %request.id(), body = ?body, "request body");
            }
        }
        Ok(())
    }

    fn on_response(&self, response: &mut ResponseContext) -> Result<(), BoxError> {
        let request = response.request();
        info!(
            request_id = %request.id(),
            method = %request.method,
            url = %request.url,
            status = response.status,
            elapsed = %render::format_elapsed(response.elapsed),
            "received response"
        );
        if self.log_bodies {
            debug!(request_id = %request.id(), body = %response.text(), "response body");
        }
        Ok(())
    }

    fn on_error(&self, error: &TransportError, request: &RequestContext) {
        warn!(
            request_id = %request.id(),
            method = %request.method,
            url = %request.url,
            error = %error,
            "request failed"
        );
    }
}
