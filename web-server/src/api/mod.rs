// web-server/src/api/mod.rs
pub mod access;
pub mod auth;
pub mod proxy;
pub mod settings;

use actix_web::web;

use crate::error::ApiError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                ApiError::Validation(err.to_string()).into()
            }))
            .service(auth::send_code)
            .service(auth::login)
            .service(auth::logout)
            .service(access::record_access)
            .service(proxy::proxy)
            .service(settings::settings)
    );
}
