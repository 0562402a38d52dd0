use super::Middleware;
use crate::{context::RequestContext, error::BoxError};

pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Sends `Authorization: Bearer <token>` with every request.
#[derive(Debug, Clone)]
pub struct BearerAuth {
    token: String,
}

impl BearerAuth {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl Middleware for BearerAuth {
    fn name(&self) -> &str {
        "bearer-auth"
    }

    fn on_request(&self, request: &mut RequestContext) -> Result<(), BoxError> {
        request
            .headers
            .insert("Authorization", format!("Bearer {}", self.token));
        Ok(())
    }
}

/// Sends an API key header, `X-API-Key` unless configured otherwise.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth {
    header_name: String,
    api_key: String,
}

impl ApiKeyAuth {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            header_name: DEFAULT_API_KEY_HEADER.to_owned(),
            api_key: api_key.into(),
        }
    }

    pub fn header_name<S: Into<String>>(mut self, header_name: S) -> Self {
        self.header_name = header_name.into();
        self
    }
}

impl Middleware for ApiKeyAuth {
    fn name(&self) -> &str {
        "api-key-auth"
    }

    fn on_request(&self, request: &mut RequestContext) -> Result<(), BoxError> {
        request
            .headers
            .insert(self.header_name.clone(), self.api_key.clone());
        Ok(())
    }
}

/// Adds a header to requests that don't already carry one with that name.
#[derive(Debug, Clone)]
pub struct DefaultHeader {
    header_name: String,
    header_value: String,
}

impl DefaultHeader {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, value: S2) -> Self {
        Self {
            header_name: name.into(),
            header_value: value.into(),
        }
    }
}

impl Middleware for DefaultHeader {
    fn name(&self) -> &str {
        "default-header"
    }

    fn on_request(&self, request: &mut RequestContext) -> Result<(), BoxError> {
        if !request.headers.contains(&self.header_name) {
            request
                .headers
                .insert(self.header_name.clone(), self.header_value.clone());
        }
        Ok(())
    }
}
