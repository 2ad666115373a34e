// server/src/api/files.rs
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use models::errors::ApiError;
use models::medical::uploaded_file::UploadedFile;
use models::medical::user::User;
use models::schemas::{FileListQuery, FileUploadResponse};
use services::file_service::UploadPart;

use crate::api::error::{HandlerResult, HttpError};
use crate::api::state::SharedState;

/// Parsed form of the multipart upload request.
#[derive(Default)]
struct UploadForm {
    parts: Vec<UploadPart>,
    descriptions: Vec<String>,
    patient_record_id: Option<i64>,
    medical_record_id: Option<i64>,
    photo_ids: Vec<i64>,
}

fn parse_id(field_name: &str, value: &str) -> Result<i64, ApiError> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| ApiError::validation(format!("Invalid {}: {}", field_name, value)))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" => {
                let original_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| ApiError::validation("File field without a filename"))?;
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read file: {}", e)))?;
                form.parts.push(UploadPart {
                    bytes: bytes.to_vec(),
                    original_name,
                    mime_type,
                });
            }
            "descriptions" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read field: {}", e)))?;
                form.descriptions.push(text);
            }
            "patient_record_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read field: {}", e)))?;
                form.patient_record_id = Some(parse_id("patient_record_id", &text)?);
            }
            "medical_record_id" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read field: {}", e)))?;
                form.medical_record_id = Some(parse_id("medical_record_id", &text)?);
            }
            "photo_ids" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::validation(format!("Failed to read field: {}", e)))?;
                form.photo_ids.push(parse_id("photo_ids", &text)?);
            }
            // unknown fields are ignored, matching lenient form handling
            _ => {}
        }
    }
    Ok(form)
}

pub async fn upload_multiple(
    State(state): State<SharedState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> HandlerResult<Json<FileUploadResponse>> {
    let actor = state.authorize(&headers).await?;
    let form = read_upload_form(multipart).await?;
    let patient_id = form
        .patient_record_id
        .ok_or_else(|| ApiError::validation("patient_record_id is required"))?;

    let files = state
        .files
        .upload_batch(
            &actor,
            patient_id,
            form.parts,
            form.descriptions,
            form.medical_record_id,
            form.photo_ids,
        )
        .await?;

    Ok(Json(FileUploadResponse {
        message: format!("{} file(s) uploaded successfully", files.len()),
        files,
    }))
}

pub async fn list(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(query): Query<FileListQuery>,
) -> HandlerResult<Json<Vec<UploadedFile>>> {
    let actor = state.authorize(&headers).await?;
    let files = state.files.list(&actor, &query).await?;
    Ok(Json(files))
}

pub async fn get_info(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<Json<UploadedFile>> {
    let actor = state.authorize(&headers).await?;
    let file = state.files.get(&actor, id).await?;
    Ok(Json(file))
}

pub async fn download(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<Response> {
    let actor = state.authorize(&headers).await?;
    let (file, bytes) = state.files.download(&actor, id).await?;

    let content_type = HeaderValue::from_str(&file.mime_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    // quotes and control characters cannot survive into the header
    let safe_name: String = file
        .original_filename
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe_name))
        .map_err(|_| HttpError(ApiError::internal("Unrepresentable filename")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn delete(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> HandlerResult<StatusCode> {
    let actor = state.authorize(&headers).await?;
    state.files.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn patients_with_files(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> HandlerResult<Json<Vec<User>>> {
    let actor = state.authorize(&headers).await?;
    let patients = state.files.patients_with_files(&actor).await?;
    Ok(Json(patients))
}
