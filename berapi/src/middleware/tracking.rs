use super::Middleware;
use crate::{
    context::{RequestContext, ResponseContext},
    error::{BoxError, TransportError},
    tracker::Tracker,
};
use std::sync::Arc;

/// Records every exchange in a shared [`Tracker`], matched by request id.
#[derive(Debug, Clone)]
pub struct TrackingMiddleware {
    tracker: Arc<Tracker>,
}

impl TrackingMiddleware {
    pub fn new(tracker: Arc<Tracker>) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Arc<Tracker> {
        &self.tracker
    }
}

impl Middleware for TrackingMiddleware {
    fn name(&self) -> &str {
        "tracking"
    }

    fn on_request(&self, request: &mut RequestContext) -> Result<(), BoxError> {
        self.tracker.track_request_for(
            request.id(),
            request.method.as_str(),
            request.url.as_str(),
            &request.headers,
            request.body.as_ref(),
        );
        Ok(())
    }

    fn on_response(&self, response: &mut ResponseContext) -> Result<(), BoxError> {
        self.tracker.track_response_for(
            response.request().id(),
            response.status,
            &response.headers,
            response.body(),
            Some(response.elapsed),
        );
        Ok(())
    }

    fn on_error(&self, error: &TransportError, request: &RequestContext) {
        self.tracker.track_error_for(request.id(), error.to_string());
    }
}
