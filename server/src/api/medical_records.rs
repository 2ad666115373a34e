// server/src/api/medical_records.rs
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use models::medical::medical_record::MedicalRecord;
use models::schemas::{MedicalRecordCreateRequest, MedicalRecordUpdateRequest};

use crate::api::error::HandlerResult;
use crate::api::state::SharedState;

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct RecordListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub patient_id: Option<i64>,
}

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<MedicalRecordCreateRequest>,
) -> HandlerResult<Json<MedicalRecord>> {
    let actor = state.authorize(&headers).await?;
    let record = state.records.create(&actor, request).await?;
    Ok(Json(record))
}

pub async fn list(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<RecordListQuery>,
) -> HandlerResult<Json<Vec<MedicalRecord>>> {
    let actor = state.authorize(&headers).await?;
    let records = state
        .records
        .list(&actor, query.patient_id, query.skip, query.limit)
        .await?;
    Ok(Json(records))
}

pub async fn get_info(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<Json<MedicalRecord>> {
    let actor = state.authorize(&headers).await?;
    let record = state.records.get(&actor, id).await?;
    Ok(Json(record))
}

pub async fn update(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<MedicalRecordUpdateRequest>,
) -> HandlerResult<Json<MedicalRecord>> {
    let actor = state.authorize(&headers).await?;
    let record = state.records.update(&actor, id, request).await?;
    Ok(Json(record))
}

pub async fn delete(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<StatusCode> {
    let actor = state.authorize(&headers).await?;
    state.records.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
