use crate::{
    context::{Headers, RequestBody, RequestContext},
    error::TransportError,
    util,
};
use async_trait::async_trait;
use bytes::Bytes;
use hyper::{body, client::HttpConnector, header::CONTENT_TYPE, Body, Method, Request};
use hyper_tls::HttpsConnector;
use std::{fmt::Debug, time::Duration};
use tracing::debug;
use url::Url;

/// Redirects followed by [`HyperTransport`] unless configured otherwise.
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

// Dropped when a redirect leaves the original host.
const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "proxy-authorization"];

/// What the transport hands back for a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
}

/// Performs the network call. Connection reuse, TLS and redirects are the
/// implementation's business.
#[async_trait]
pub trait HttpTransport: Debug + Send + Sync {
    async fn send(
        &self,
        request: &RequestContext,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// Default transport: a pooled hyper client speaking HTTP and HTTPS that
/// follows redirects.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: hyper::Client<HttpsConnector<HttpConnector>>,
    max_redirects: usize,
}

/// One hop of a request, possibly rewritten by a redirect.
struct Hop<'a> {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<&'a RequestBody>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self {
            client: hyper::Client::builder().build(HttpsConnector::new()),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Follows at most `max_redirects` redirects; `0` returns every 3xx as is.
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    fn build_request(hop: &Hop<'_>) -> Result<Request<Body>, TransportError> {
        let mut request_builder = Request::builder()
            .uri(hop.url.as_str())
            .method(hop.method.clone());

        let body = hop.body.map(|body| body.to_bytes()).unwrap_or_default();

        if let Some(headers_mut) = request_builder.headers_mut() {
            util::put_headers(headers_mut, hop.headers.iter())?;

            let implied = hop.body.and_then(|body| body.content_type());
            if let (false, Some(content_type)) = (headers_mut.contains_key(CONTENT_TYPE), implied) {
                headers_mut.insert(CONTENT_TYPE, content_type.parse()?);
            }
        }

        Ok(request_builder.body(Body::from(body))?)
    }

    async fn exchange(&self, request: Request<Body>) -> Result<TransportResponse, TransportError> {
        let response = self.client.request(request).await?;

        let status = response.status().as_u16();
        let headers = util::extract_headers(response.headers());
        let body = body::to_bytes(response.into_body()).await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn follow(&self, request: &RequestContext) -> Result<TransportResponse, TransportError> {
        let mut hop = Hop::from(request);

        let mut redirects = 0;
        loop {
            let response = self.exchange(Self::build_request(&hop)?).await?;

            let next = match redirect_target(&hop.url, &response)? {
                Some(next) if redirects < self.max_redirects => next,
                Some(_) if self.max_redirects > 0 => {
                    return Err(TransportError::TooManyRedirects(self.max_redirects))
                }
                _ => return Ok(response),
            };

            redirects += 1;
            debug!(status = response.status, from = %hop.url, to = %next, "following redirect");
            hop.redirect(response.status, next);
        }
    }
}

impl<'a> From<&'a RequestContext> for Hop<'a> {
    fn from(request: &'a RequestContext) -> Self {
        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: request.headers.clone(),
            body: request.body.as_ref(),
        }
    }
}

impl Hop<'_> {
    fn redirect(&mut self, status: u16, next: Url) {
        // 301/302/303 turn anything but HEAD into a bodiless GET; 307/308 repeat the request.
        if matches!(status, 301..=303) && self.method != Method::HEAD {
            self.method = Method::GET;
            self.body = None;
            self.headers.remove("content-type");
            self.headers.remove("content-length");
        }

        if next.origin() != self.url.origin() {
            for name in SENSITIVE_HEADERS {
                self.headers.remove(name);
            }
        }

        self.url = next;
    }
}

/// Where a redirect response points, resolved against `current`.
/// `None` when the response is not a redirect or carries no `Location`.
fn redirect_target(
    current: &Url,
    response: &TransportResponse,
) -> Result<Option<Url>, TransportError> {
    if !matches!(response.status, 301..=303 | 307 | 308) {
        return Ok(None);
    }

    match response.headers.get("location") {
        Some(location) => current.join(location).map(Some).map_err(|e| {
            TransportError::InvalidRedirect(format!("`{}`: {}", location, e))
        }),
        None => Ok(None),
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn send(
        &self,
        request: &RequestContext,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, ?timeout, "dispatching request");

        match tokio::time::timeout(timeout, self.follow(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}
