// web-server/src/proxy.rs
use std::collections::BTreeMap;

use actix_web::http::StatusCode;
use common::ServerDescriptor;
use futures_util::future::join_all;
use reqwest::header::AUTHORIZATION;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use thiserror::Error;

/// Why a single server's data could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Invalid server ID")]
    InvalidId,

    #[error("Failed to fetch server data")]
    FetchFailed,
}

impl FetchError {
    /// Error code the dashboard tiles understand
    pub fn code(self) -> i64 {
        match self {
            FetchError::InvalidId => 1,
            FetchError::FetchFailed => 2,
        }
    }

    /// Status used when a single server is requested on its own
    pub fn status(self) -> StatusCode {
        match self {
            FetchError::InvalidId => StatusCode::BAD_REQUEST,
            FetchError::FetchFailed => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Result for one server id. Successful payloads are passed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Ok(Value),
    Err(FetchError),
}

impl Serialize for FetchOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FetchOutcome::Ok(payload) => payload.serialize(serializer),
            FetchOutcome::Err(err) => json!({ "code": err.code(), "error": err.to_string() }).serialize(serializer),
        }
    }
}

/// Fetches live GPU snapshots from the configured monitoring endpoints
pub struct Aggregator {
    servers: BTreeMap<String, ServerDescriptor>,
    http: reqwest::Client,
}

impl Aggregator {
    pub fn new(servers: BTreeMap<String, ServerDescriptor>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { servers, http })
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Fetch one server. Each call is an independent attempt with no retry.
    pub async fn fetch_one(&self, id: &str) -> FetchOutcome {
        let Some(server) = self.servers.get(id) else {
            tracing::warn!("Proxy request for unknown server id {:?}", id);
            return FetchOutcome::Err(FetchError::InvalidId);
        };

        let mut request = self.http.get(&server.url);
        if let Some(token) = &server.token {
            request = request.header(AUTHORIZATION, token.as_str());
        }

        let payload = match request.send().await {
            Ok(response) => response.json::<Value>().await,
            Err(e) => Err(e),
        };

        match payload {
            Ok(payload) => {
                if let Some(code) = payload.get("code").and_then(Value::as_i64).filter(|code| *code != 0) {
                    tracing::debug!("Server {} reported status code {}", id, code);
                }
                FetchOutcome::Ok(payload)
            }
            Err(e) => {
                tracing::warn!("Error fetching server {}: {}", id, e);
                FetchOutcome::Err(FetchError::FetchFailed)
            }
        }
    }

    /// Fetch every distinct id concurrently and wait for all of them.
    ///
    /// One entry per id comes back no matter how its fetch went; a slow or
    /// failing server never holds back or fails the others.
    pub async fn fetch_batch(&self, ids: &[String]) -> BTreeMap<String, FetchOutcome> {
        let mut distinct: Vec<&str> = Vec::with_capacity(ids.len());
        for id in ids {
            if !distinct.contains(&id.as_str()) {
                distinct.push(id.as_str());
            }
        }

        let fetches = distinct.into_iter().map(|id| async move {
            (id.to_string(), self.fetch_one(id).await)
        });

        join_all(fetches).await.into_iter().collect()
    }
}
