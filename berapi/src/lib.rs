//! Fluent HTTP client for API tests.
//!
//! Every request runs through an ordered [`Pipeline`] of [`Middleware`] hooks.
//! A [`Tracker`] can record the most recent exchanges, masking sensitive
//! headers, so a failing test prints what was actually sent and received.
//!
//! ```no_run
//! use berapi::{middleware::BearerAuth, Client, TrackerConfig};
//!
//! # async fn run() -> berapi::Result<()> {
//! let api = Client::builder()
//!     .base_url("https://jsonplaceholder.typicode.com")
//!     .middleware(BearerAuth::new("token"))
//!     .tracking(TrackerConfig::new().mask_header("Authorization"))
//!     .build()?;
//!
//! api.get("/users/1").send().await?.assert_2xx().assert_has_key("email");
//! # Ok(())
//! # }
//! ```

mod client;
mod context;
mod error;
pub mod middleware;
mod pipeline;
mod response;
pub mod session;
mod settings;
pub mod tracker;
mod transport;
mod util;

pub use berapi_codegen::berapi_test;
pub use client::{Client, ClientBuilder, RequestBuilder};
pub use context::{Headers, RequestBody, RequestContext, ResponseContext};
pub use error::{BoxError, Error, Result, TransportError};
pub use middleware::Middleware;
pub use pipeline::{Phase, Pipeline};
pub use response::Response;
pub use session::TestSession;
pub use settings::Settings;
pub use tracker::{Tracker, TrackerConfig};
pub use transport::{HttpTransport, HyperTransport, TransportResponse};
