// server/src/api/patients.rs
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;

use models::medical::user::User;
use models::schemas::{PageQuery, PatientCreateRequest};

use crate::api::error::HandlerResult;
use crate::api::state::SharedState;

pub async fn create(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Json(request): Json<PatientCreateRequest>,
) -> HandlerResult<Json<User>> {
    let actor = state.authorize(&headers).await?;
    let patient = state.patients.create_patient(&actor, request).await?;
    Ok(Json(patient))
}

pub async fn list(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(page): Query<PageQuery>,
) -> HandlerResult<Json<Vec<User>>> {
    let actor = state.authorize(&headers).await?;
    let patients = state
        .patients
        .list_patients(&actor, page.skip, page.limit)
        .await?;
    Ok(Json(patients))
}
