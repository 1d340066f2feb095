// web-server/src/api/settings.rs
use actix_web::{get, web, HttpResponse};
use common::{Config, SettingsResponse};

/// What the dashboard page needs to lay itself out
#[get("/settings")]
pub async fn settings(config: web::Data<Config>) -> HttpResponse {
    HttpResponse::Ok().json(SettingsResponse {
        title: config.site_title.clone(),
        server_ids: config.display_order(),
        no_need_login: config.auth.no_need_login,
    })
}
