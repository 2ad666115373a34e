// server/src/api/mod.rs

pub mod auth;
pub mod error;
pub mod files;
pub mod medical_records;
pub mod patients;
pub mod state;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};

use services::config::ServerConfig;

use crate::api::state::SharedState;

pub fn build_router(state: SharedState, config: &ServerConfig) -> Result<Router> {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .map(|o| o.parse::<HeaderValue>().context("Invalid allowed origin"))
        .collect::<Result<_>>()?;
    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    // whole multipart body: several files per request plus form overhead
    let body_limit = (config.max_file_size as usize).saturating_mul(10);

    let router = Router::new()
        .route("/health", get(health))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/logout", post(auth::logout))
        .route(
            "/api/files/upload-multiple-to-patient-record",
            post(files::upload_multiple),
        )
        .route("/api/files/", get(files::list))
        .route("/api/files/patients", get(files::patients_with_files))
        .route("/api/files/:id", get(files::get_info).delete(files::delete))
        .route("/api/files/:id/download", get(files::download))
        .route("/api/patients/", post(patients::create).get(patients::list))
        .route(
            "/api/medical-records/",
            post(medical_records::create).get(medical_records::list),
        )
        .route(
            "/api/medical-records/:id",
            get(medical_records::get_info)
                .put(medical_records::update)
                .delete(medical_records::delete),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state);

    Ok(router)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
