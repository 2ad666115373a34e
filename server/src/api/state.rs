// server/src/api/state.rs
use std::sync::Arc;

use axum::http::HeaderMap;

use models::errors::{ApiError, ApiResult};
use models::medical::user::User;
use services::auth::TokenService;
use services::config::ServerConfig;
use services::storage_engine::{BlobStore, RecordStore};
use services::{FileService, MedicalRecordService, PatientService, UserService};

/// Everything a request handler needs, behind an Arc. The backend is
/// stateless per request: every call re-authenticates from the bearer
/// token, no session state lives here.
pub struct AppState {
    pub users: UserService,
    pub patients: PatientService,
    pub records: MedicalRecordService,
    pub files: FileService,
    pub tokens: TokenService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        config: &ServerConfig,
    ) -> Self {
        AppState {
            users: UserService::new(store.clone()),
            patients: PatientService::new(store.clone()),
            records: MedicalRecordService::new(store.clone()),
            files: FileService::new(
                store,
                blobs,
                config.max_file_size,
                config.allowed_extensions.clone(),
            ),
            tokens: TokenService::new(&config.token_secret, config.token_ttl_minutes),
        }
    }

    /// Resolves the acting user from the Authorization header.
    pub async fn authorize(&self, headers: &HeaderMap) -> ApiResult<User> {
        let token = extract_bearer_token(headers)?;
        let claims = self.tokens.verify(&token)?;
        let user = self
            .users
            .get_by_username(&claims.sub)
            .await?
            .ok_or_else(|| ApiError::unauthorized("User not found"))?;
        if !user.is_active {
            return Err(ApiError::unauthorized("User is inactive"));
        }
        Ok(user)
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> ApiResult<String> {
    let auth_header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    if !auth_header.starts_with("Bearer ") {
        return Err(ApiError::unauthorized(
            "Authorization header must use Bearer scheme",
        ));
    }

    Ok(auth_header[7..].to_string())
}
