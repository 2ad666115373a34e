// models/src/schemas.rs
//! Request/response shapes for the HTTP surface. These mirror the wire
//! contract, not the storage rows; storage rows live in `medical`.
use serde::{Deserialize, Serialize};

use crate::medical::uploaded_file::{FileType, UploadedFile};
use crate::medical::user::Role;

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

impl TokenResponse {
    pub fn bearer(access_token: String) -> Self {
        TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

/// Body for staff-initiated patient provisioning. `admin_password` is the
/// caller's own credential re-entered as a confirmation step.
#[derive(Debug, Clone, Deserialize)]
pub struct PatientCreateRequest {
    pub first_name: String,
    pub last_name: String,
    pub initial_diagnosis: Option<String>,
    pub admin_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicalRecordCreateRequest {
    pub patient_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

/// Partial update body; absent fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicalRecordUpdateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileListQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    pub patient_id: Option<i64>,
    pub medical_record_id: Option<i64>,
    pub file_type: Option<FileType>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileUploadResponse {
    pub message: String,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
