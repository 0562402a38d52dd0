use crate::{
    context::{Headers, RequestBody, RequestContext, ResponseContext},
    error::{Error, Result},
    middleware::{Middleware, TrackingMiddleware},
    pipeline::Pipeline,
    response::Response,
    settings::Settings,
    tracker::{Tracker, TrackerConfig},
    transport::{HttpTransport, HyperTransport},
};
use hyper::Method;
use serde::Serialize;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tracing::debug;
use url::Url;

/// Builder used to build a [`Client`].
#[derive(Debug, Default)]
pub struct ClientBuilder {
    settings: Settings,
    pipeline: Pipeline,
    transport: Option<Arc<dyn HttpTransport>>,
    tracker: Option<Arc<Tracker>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every setting configured so far.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.settings.set_base_url(base_url);
        self
    }

    /// Default header sent with every request.
    pub fn header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.settings.set_header(name, value);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.set_timeout(timeout);
        self
    }

    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline.push(Arc::new(middleware));
        self
    }

    /// Installs a middleware instance that may also be used by other clients.
    pub fn shared_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.pipeline.push(middleware);
        self
    }

    pub fn transport<T: HttpTransport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Records exchanges in `tracker`. Requests are recorded after every
    /// user before-hook ran, responses before any user after-hook runs.
    pub fn tracker(mut self, tracker: Arc<Tracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Records exchanges in a new tracker built from `config`.
    pub fn tracking(mut self, config: TrackerConfig) -> Self {
        self.settings.set_tracker(config);
        self
    }

    pub fn build(self) -> Result<Client> {
        if let Some(base_url) = self.settings.base_url() {
            Url::parse(base_url).map_err(|e| Error::InvalidUrl {
                url: base_url.to_owned(),
                reason: e.to_string(),
            })?;
        }

        let tracker = self.tracker.or_else(|| {
            self.settings
                .tracker()
                .map(|config| Arc::new(Tracker::with_config(config.clone())))
        });

        let mut tracking = Pipeline::new();
        if let Some(tracker) = &tracker {
            tracking.push(Arc::new(TrackingMiddleware::new(tracker.clone())));
        }

        Ok(Client {
            settings: self.settings,
            pipeline: self.pipeline,
            tracking,
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HyperTransport::new())),
            tracker,
        })
    }
}

/// Fluent HTTP client that runs every request through its middleware pipeline.
#[derive(Debug, Clone)]
pub struct Client {
    settings: Settings,
    pipeline: Pipeline,
    // Tracking hooks: run after the user before-hooks and ahead of the user after-hooks.
    tracking: Pipeline,
    transport: Arc<dyn HttpTransport>,
    tracker: Option<Arc<Tracker>>,
}

impl Client {
    pub fn new(settings: Settings) -> Result<Self> {
        Self::builder().settings(settings).build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Appends `middleware` to the user pipeline. Request tracking keeps
    /// recording the request as sent, including changes made by `middleware`.
    pub fn add_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.pipeline.push(Arc::new(middleware));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// User middleware, without the tracking slot.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Tracker installed through the builder, for test-runner hooks.
    pub fn tracker(&self) -> Option<&Arc<Tracker>> {
        self.tracker.as_ref()
    }

    pub fn get(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::GET, target)
    }

    pub fn post(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::POST, target)
    }

    pub fn put(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::PUT, target)
    }

    pub fn patch(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::PATCH, target)
    }

    pub fn delete(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::DELETE, target)
    }

    pub fn head(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::HEAD, target)
    }

    pub fn options(&self, target: &str) -> RequestBuilder<'_> {
        self.request(Method::OPTIONS, target)
    }

    /// `target` is either an absolute `http(s)` URL or a path joined to the base URL.
    pub fn request(&self, method: Method, target: &str) -> RequestBuilder<'_> {
        RequestBuilder {
            client: self,
            method,
            target: target.to_owned(),
            headers: Headers::new(),
            query: Vec::new(),
            body: None,
            timeout: None,
            error: None,
        }
    }

    /// Runs a prepared request through the pipeline and the transport.
    pub async fn execute(&self, mut request: RequestContext) -> Result<Response> {
        self.pipeline.run_before(&mut request)?;
        self.tracking.run_before(&mut request)?;

        let request = Arc::new(request);
        debug!(request_id = %request.id(), method = %request.method, url = %request.url, "sending");

        let started = Instant::now();
        let result = self.transport.send(&request, request.timeout).await;
        let elapsed = started.elapsed();

        match result {
            Ok(response) => {
                debug!(request_id = %request.id(), status = response.status, ?elapsed, "received");
                let mut context = ResponseContext::new(
                    request,
                    response.status,
                    response.headers,
                    response.body,
                    elapsed,
                );
                self.tracking.run_after(&mut context)?;
                self.pipeline.run_after(&mut context)?;
                Ok(Response::new(context))
            }
            Err(error) => {
                debug!(request_id = %request.id(), %error, "transport failed");
                self.pipeline.run_error(&error, &request);
                self.tracking.run_error(&error, &request);
                Err(Error::Transport(error))
            }
        }
    }

    fn resolve_url(&self, target: &str, query: &[(String, String)]) -> Result<Url> {
        let absolute = {
            let lower = target.to_ascii_lowercase();
            lower.starts_with("http://") || lower.starts_with("https://")
        };

        let joined = match (absolute, self.settings.base_url()) {
            (true, _) => target.to_owned(),
            (false, Some(base)) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                target.trim_start_matches('/')
            ),
            (false, None) => {
                return Err(Error::InvalidUrl {
                    url: target.to_owned(),
                    reason: "relative target without a base url".to_owned(),
                })
            }
        };

        let mut url = Url::parse(&joined).map_err(|e| Error::InvalidUrl {
            url: joined.clone(),
            reason: e.to_string(),
        })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        Ok(url)
    }
}

/// One request under construction. Nothing is sent until [`send`](Self::send).
#[derive(Debug)]
pub struct RequestBuilder<'a> {
    client: &'a Client,
    method: Method,
    target: String,
    headers: Headers,
    query: Vec<(String, String)>,
    body: Option<RequestBody>,
    timeout: Option<Duration>,
    error: Option<Error>,
}

impl<'a> RequestBuilder<'a> {
    /// Overrides a default header of the same name, compared case-insensitively.
    pub fn header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers<K: Into<String>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(
        mut self,
        headers: I,
    ) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn query<K: Into<String>, V: ToString>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(RequestBody::Json(value)),
            Err(e) => self.error = Some(Error::Json(e)),
        }
        self
    }

    pub fn form<K: Into<String>, V: Into<String>, I: IntoIterator<Item = (K, V)>>(
        mut self,
        fields: I,
    ) -> Self {
        let fields = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn text<S: Into<String>>(mut self, body: S) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn bytes<B: Into<bytes::Bytes>>(mut self, body: B) -> Self {
        self.body = Some(RequestBody::Bytes(body.into()));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn send(self) -> Result<Response> {
        if let Some(error) = self.error {
            return Err(error);
        }

        let client = self.client;
        let url = client.resolve_url(&self.target, &self.query)?;

        let mut headers = client.settings.headers().clone();
        headers.merge(&self.headers);

        let mut request = RequestContext::new(
            self.method,
            url,
            self.timeout.unwrap_or_else(|| client.settings.timeout()),
        );
        request.headers = headers;
        request.body = self.body;

        client.execute(request).await
    }
}
