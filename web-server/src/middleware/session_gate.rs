// web-server/src/middleware/session_gate.rs
use std::sync::Arc;
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    Error, HttpResponse,
};
use common::{validate_session_token, Config};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use serde_json::json;

use crate::auth::policy::bypass_matches;
use crate::auth::{removal_cookie, AUTH_COOKIE};

pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";

/// Image files are served without a session
const PUBLIC_EXTENSIONS: &[&str] = &[".png", ".jpg", ".svg"];

/// Outcome of running a request through the gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect { location: &'static str, clear_cookie: bool },
    Unauthorized { clear_cookie: bool },
}

impl GateDecision {
    /// Response that replaces the handler, or `None` when the request may proceed
    pub fn into_response(self) -> Option<HttpResponse> {
        match self {
            GateDecision::Allow => None,
            GateDecision::Redirect { location, clear_cookie } => {
                let mut builder = HttpResponse::TemporaryRedirect();
                builder.insert_header((header::LOCATION, location));
                if clear_cookie {
                    builder.cookie(removal_cookie());
                }
                Some(builder.finish())
            }
            GateDecision::Unauthorized { clear_cookie } => {
                let mut builder = HttpResponse::Unauthorized();
                if clear_cookie {
                    builder.cookie(removal_cookie());
                }
                Some(builder.json(json!({ "error": "Unauthorized" })))
            }
        }
    }
}

/// Routing decisions for every inbound request. Reads only the request's own
/// cookie and process-wide configuration.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    no_need_login: bool,
    public_paths: Vec<String>,
    bypass_token: Option<String>,
    jwt_secret: Vec<u8>,
}

impl GatePolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            no_need_login: config.auth.no_need_login,
            public_paths: config.auth.public_paths.clone(),
            bypass_token: config.auth.bypass_token.clone(),
            jwt_secret: config.auth.jwt_secret.as_bytes().to_vec(),
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        self.public_paths.iter().any(|public| {
            path == public
                || path
                    .strip_prefix(public.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        }) || PUBLIC_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
    }

    fn token_is_valid(&self, token: &str) -> bool {
        validate_session_token(token, &self.jwt_secret).is_ok()
    }

    pub fn decide(&self, path: &str, token: Option<&str>) -> GateDecision {
        let token = token.filter(|t| !t.is_empty());

        if self.no_need_login {
            if path == LOGIN_ROUTE {
                return GateDecision::Redirect { location: HOME_ROUTE, clear_cookie: false };
            }
            return GateDecision::Allow;
        }

        if path == LOGIN_ROUTE && token.is_some_and(|t| self.token_is_valid(t)) {
            return GateDecision::Redirect { location: HOME_ROUTE, clear_cookie: false };
        }

        if self.is_public(path) {
            return GateDecision::Allow;
        }

        if bypass_matches(self.bypass_token.as_deref(), token) {
            return GateDecision::Allow;
        }

        let Some(token) = token else {
            return if path == HOME_ROUTE {
                GateDecision::Redirect { location: LOGIN_ROUTE, clear_cookie: false }
            } else {
                GateDecision::Unauthorized { clear_cookie: false }
            };
        };

        if self.token_is_valid(token) {
            GateDecision::Allow
        } else if path == HOME_ROUTE {
            GateDecision::Redirect { location: LOGIN_ROUTE, clear_cookie: true }
        } else {
            GateDecision::Unauthorized { clear_cookie: true }
        }
    }
}

/// Middleware applying [`GatePolicy`] before any route handler runs
#[derive(Debug, Clone)]
pub struct SessionGate {
    policy: Arc<GatePolicy>,
}

impl SessionGate {
    pub fn new(config: &Config) -> Self {
        Self {
            policy: Arc::new(GatePolicy::from_config(config)),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionGate
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = SessionGateMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionGateMiddleware {
            service,
            policy: self.policy.clone(),
        }))
    }
}

pub struct SessionGateMiddleware<S> {
    service: S,
    policy: Arc<GatePolicy>,
}

impl<S, B> Service<ServiceRequest> for SessionGateMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req.cookie(AUTH_COOKIE).map(|c| c.value().to_string());
        let decision = self.policy.decide(req.path(), token.as_deref());
        tracing::trace!("Session gate decision for {}: {:?}", req.path(), decision);

        let Some(response) = decision.into_response() else {
            let fut = self.service.call(req);
            return Box::pin(async move {
                fut.await.map(ServiceResponse::map_into_left_body)
            });
        };

        tracing::debug!("Session gate blocked {} with {}", req.path(), response.status());
        Box::pin(async move {
            Ok(req.into_response(response).map_into_right_body())
        })
    }
}
