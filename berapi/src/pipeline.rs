use crate::{
    context::{RequestContext, ResponseContext},
    error::{Error, Result, TransportError},
    middleware::Middleware,
};
use std::{fmt, sync::Arc};
use tracing::trace;

/// Phase in which a middleware hook failed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Phase {
    Request,
    Response,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Request => f.write_str("request"),
            Phase::Response => f.write_str("response"),
        }
    }
}

/// Ordered middleware, run in registration order for every phase.
///
/// The after-phase is not reversed. A failing hook ends its phase and the
/// middleware registered after it are not invoked for that request.
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.middleware.push(middleware);
    }

    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }

    pub fn run_before(&self, request: &mut RequestContext) -> Result<()> {
        for middleware in &self.middleware {
            trace!(middleware = middleware.name(), "on_request");
            middleware
                .on_request(request)
                .map_err(|e| Error::middleware(middleware.name(), Phase::Request, e))?;
        }
        Ok(())
    }

    pub fn run_after(&self, response: &mut ResponseContext) -> Result<()> {
        for middleware in &self.middleware {
            trace!(middleware = middleware.name(), "on_response");
            middleware
                .on_response(response)
                .map_err(|e| Error::middleware(middleware.name(), Phase::Response, e))?;
        }
        Ok(())
    }

    pub fn run_error(&self, error: &TransportError, request: &RequestContext) {
        for middleware in &self.middleware {
            trace!(middleware = middleware.name(), "on_error");
            middleware.on_error(error, request);
        }
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<Arc<dyn Middleware>> for Pipeline {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Middleware>>>(iter: I) -> Self {
        Self {
            middleware: iter.into_iter().collect(),
        }
    }
}
