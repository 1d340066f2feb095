// common/src/utils.rs
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use jsonwebtoken::{encode, decode, Header, Algorithm, Validation, EncodingKey, DecodingKey};

use crate::models::session::SessionClaims;

/// Setup tracing for consistent logging. `RUST_LOG` overrides the default `info` level.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Sign a 30-day session token for `email`, issued at `issued_at` (Unix seconds).
pub fn generate_session_token(email: &str, issued_at: i64, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    sign_session_claims(&SessionClaims::new(email, issued_at), secret)
}

pub fn sign_session_claims(claims: &SessionClaims, secret: &[u8]) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(secret)
    )
}

/// Check signature and expiry. Nothing else is consulted.
pub fn validate_session_token(token: &str, secret: &[u8]) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret),
        &validation
    )?;

    Ok(token_data.claims)
}
