// web-server/src/api/access.rs
use actix_web::{post, web, HttpRequest, HttpResponse};
use common::{validate_session_token, Config, StatusResponse};

use crate::access_log::AccessRecorder;
use crate::auth::AUTH_COOKIE;
use crate::error::ApiError;

/// Record who opened the dashboard. Called once per page load.
#[post("/access")]
pub async fn record_access(
    req: HttpRequest,
    config: web::Data<Config>,
    recorder: web::Data<AccessRecorder>,
) -> Result<HttpResponse, ApiError> {
    let cookie = req
        .cookie(AUTH_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Unauthorized".to_string()))?;

    let claims = validate_session_token(cookie.value(), config.auth.jwt_secret.as_bytes())
        .map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            ApiError::Unauthorized("Invalid token".to_string())
        })?;

    if claims.email.is_empty() {
        return Err(ApiError::Unauthorized("Invalid token".to_string()));
    }

    let ip = req
        .connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string();

    // best effort, the page load succeeds either way
    recorder.record(&claims.email, &ip).await;

    Ok(HttpResponse::Ok().json(StatusResponse::ok()))
}
