use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use crate::error::OracleError;

/// Local development front-ends that may call the oracle out of the box.
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8000",
    "http://127.0.0.1:5173",
    "http://localhost:5173",
];

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedOrigins {
    Any,
    List(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("allowing any origin cannot be combined with credentialed requests")]
    CredentialsWithAnyOrigin,
    #[error("allowing any origin is only permitted in development mode")]
    AnyOriginOutsideDevMode,
    #[error("no allowed origins configured")]
    NoOrigins,
}

/// The set of callers permitted to reach the oracle routes.
#[derive(Debug, Clone)]
pub struct TrustPolicy {
    origins: AllowedOrigins,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct TrustPolicyBuilder {
    origins: BTreeSet<String>,
    allow_any_origin: bool,
    dev_mode: bool,
    allow_credentials: bool,
    max_age: Option<Duration>,
}

impl TrustPolicyBuilder {
    /// Add an exact origin. `*` is read as allow-any.
    pub fn origin(mut self, origin: impl AsRef<str>) -> Self {
        let origin = origin.as_ref().trim();
        if origin == "*" {
            self.allow_any_origin = true;
        } else if !origin.is_empty() {
            self.origins.insert(origin.to_string());
        }
        self
    }

    pub fn origins<I, S>(self, origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        origins
            .into_iter()
            .fold(self, |builder, origin| builder.origin(origin))
    }

    pub fn allow_any_origin(mut self, allow: bool) -> Self {
        self.allow_any_origin |= allow;
        self
    }

    pub fn dev_mode(mut self, dev_mode: bool) -> Self {
        self.dev_mode = dev_mode;
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn max_age(mut self, max_age: Option<Duration>) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn build(self) -> Result<TrustPolicy, PolicyError> {
        let origins = if self.allow_any_origin {
            if self.allow_credentials {
                return Err(PolicyError::CredentialsWithAnyOrigin);
            }
            if !self.dev_mode {
                return Err(PolicyError::AnyOriginOutsideDevMode);
            }
            AllowedOrigins::Any
        } else if self.origins.is_empty() {
            return Err(PolicyError::NoOrigins);
        } else {
            AllowedOrigins::List(self.origins)
        };

        Ok(TrustPolicy {
            origins,
            allow_credentials: self.allow_credentials,
            max_age: self.max_age,
        })
    }
}

impl TrustPolicy {
    pub fn builder() -> TrustPolicyBuilder {
        TrustPolicyBuilder::default()
    }

    /// Whether a request declaring `origin` may be processed. Requests
    /// without an `Origin` header are only admitted under allow-any.
    pub fn allows(&self, origin: Option<&str>) -> bool {
        match (&self.origins, origin) {
            (AllowedOrigins::Any, _) => true,
            (AllowedOrigins::List(list), Some(origin)) => list.contains(origin),
            (AllowedOrigins::List(_), None) => false,
        }
    }

    pub fn origins(&self) -> &AllowedOrigins {
        &self.origins
    }

    pub fn allows_credentials(&self) -> bool {
        self.allow_credentials
    }

    fn apply_cors_headers(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        let allow_origin = match (&self.origins, origin) {
            (AllowedOrigins::Any, _) => HeaderValue::from_static("*"),
            (AllowedOrigins::List(_), Some(origin)) => match HeaderValue::from_str(origin) {
                Ok(value) => value,
                Err(_) => return,
            },
            (AllowedOrigins::List(_), None) => return,
        };
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow_origin);
        headers.append(header::VARY, HeaderValue::from_static("Origin"));
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }

    fn preflight(&self, origin: Option<&str>, request_headers: &HeaderMap) -> Response {
        let mut response = StatusCode::NO_CONTENT.into_response();
        let headers = response.headers_mut();
        self.apply_cors_headers(origin, headers);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOWED_METHODS),
        );
        let allow_headers = request_headers
            .get(header::ACCESS_CONTROL_REQUEST_HEADERS)
            .cloned()
            .unwrap_or_else(|| HeaderValue::from_static("Content-Type"));
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, allow_headers);
        headers.append(
            header::VARY,
            HeaderValue::from_static("Access-Control-Request-Headers"),
        );
        if let Some(max_age) = self.max_age {
            headers.insert(
                header::ACCESS_CONTROL_MAX_AGE,
                HeaderValue::from(max_age.as_secs()),
            );
        }
        response
    }
}

/// Middleware guarding the oracle routes. Runs before any extractor, so a
/// rejected request never has its body read and never reaches the key store.
pub async fn enforce(
    State(policy): State<Arc<TrustPolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    if !policy.allows(origin.as_deref()) {
        return OracleError::TrustRejected.into_response();
    }

    if request.method() == Method::OPTIONS {
        return policy.preflight(origin.as_deref(), request.headers());
    }

    let mut response = next.run(request).await;
    policy.apply_cors_headers(origin.as_deref(), response.headers_mut());
    response
}
