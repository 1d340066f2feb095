// web-server/src/api/proxy.rs
use actix_web::{post, web, HttpResponse};
use common::{ProxyRequest, ServerSelection};
use serde_json::json;

use crate::proxy::{Aggregator, FetchOutcome};

/// Live data for one server (bare result) or several (keyed by id)
#[post("/proxy")]
pub async fn proxy(
    body: web::Json<ProxyRequest>,
    aggregator: web::Data<Aggregator>,
) -> HttpResponse {
    match body.into_inner().server_id {
        None => server_id_required(),
        Some(ServerSelection::One(id)) if id.is_empty() => server_id_required(),
        Some(ServerSelection::One(id)) => match aggregator.fetch_one(&id).await {
            FetchOutcome::Ok(payload) => HttpResponse::Ok().json(payload),
            FetchOutcome::Err(err) => HttpResponse::build(err.status()).json(json!({ "error": err.to_string() })),
        },
        Some(ServerSelection::Many(ids)) => HttpResponse::Ok().json(aggregator.fetch_batch(&ids).await),
    }
}

fn server_id_required() -> HttpResponse {
    HttpResponse::BadRequest().json(json!({ "error": "Server ID is required" }))
}
