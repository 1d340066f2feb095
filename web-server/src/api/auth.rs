// web-server/src/api/auth.rs
use actix_web::{post, web, HttpResponse};
use common::{LoginRequest, LoginResponse, SendCodeRequest, StatusResponse};

use crate::auth::{removal_cookie, session_cookie, VerificationService};
use crate::error::ApiError;

#[post("/auth/send-code")]
pub async fn send_code(
    body: web::Json<SendCodeRequest>,
    service: web::Data<VerificationService>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim();

    match service.request_code(email).await {
        Ok(()) => Ok(HttpResponse::Ok().json(StatusResponse::with_message(true, "Verification code sent"))),
        Err(e) if e.is_internal() => {
            tracing::error!("Failed to send verification code to {}: {}", email, e);
            Err(ApiError::Internal(
                "Failed to send verification code, please try again later".to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[post("/auth/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    service: web::Data<VerificationService>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim();
    let token = service.login(email, body.code.trim()).await?;

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token.clone()))
        .json(LoginResponse {
            message: "Login successful".to_string(),
            token,
        }))
}

#[post("/auth/logout")]
pub async fn logout() -> HttpResponse {
    HttpResponse::Ok()
        .cookie(removal_cookie())
        .json(StatusResponse::ok())
}
