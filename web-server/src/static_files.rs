// web-server/src/static_files.rs
use actix_web::{web, HttpRequest, HttpResponse, Result, Error};
use actix_files::{Files, NamedFile};
use common::StaticFilesConfig;

async fn serve(req: HttpRequest, config: web::Data<StaticFilesConfig>, file: &str) -> Result<HttpResponse, Error> {
    let file = NamedFile::open(config.path.join(file))?;
    Ok(file.into_response(&req))
}

async fn index_page(req: HttpRequest, config: web::Data<StaticFilesConfig>) -> Result<HttpResponse, Error> {
    let index = config.index.clone();
    serve(req, config, &index).await
}

async fn login_page(req: HttpRequest, config: web::Data<StaticFilesConfig>) -> Result<HttpResponse, Error> {
    let login = config.login.clone();
    serve(req, config, &login).await
}

async fn favicon(req: HttpRequest, config: web::Data<StaticFilesConfig>) -> Result<HttpResponse, Error> {
    serve(req, config, "favicon.ico").await
}

// Dashboard and login pages plus their assets
pub fn configure(cfg: &mut web::ServiceConfig, config: &StaticFilesConfig) {
    cfg.app_data(web::Data::new(config.clone()))
        .route("/", web::get().to(index_page))
        .route("/login", web::get().to(login_page))
        .route("/favicon.ico", web::get().to(favicon))
        .service(
            Files::new("/static", &config.path)
                .prefer_utf8(true)
                .use_etag(true)
                .use_last_modified(true)
        );
}
