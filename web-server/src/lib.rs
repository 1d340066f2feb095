// web-server/src/lib.rs
//! GPU Dashboard web server: login gate, GPU data proxy and access audit.

pub mod access_log;
pub mod api;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod static_files;
pub mod utils;

use actix_web::web;
use common::Config;

/// Every route the dashboard serves. Wrap the app in
/// [`middleware::SessionGate`] to protect them.
pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    cfg.configure(api::configure);
    static_files::configure(cfg, &config.static_files);
}
