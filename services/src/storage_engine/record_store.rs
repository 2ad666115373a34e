// services/src/storage_engine/record_store.rs
use async_trait::async_trait;

use models::errors::ApiResult;
use models::medical::medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord};
use models::medical::uploaded_file::{FileType, NewUploadedFile, UploadedFile};
use models::medical::user::{NewUser, Role, User};

/// Clamps client-supplied paging before it reaches a backend. A negative
/// skip becomes zero and a nonpositive limit falls back to the default
/// page size, so `?skip=-1` can never turn into `OFFSET -1` in SQL.
pub fn page_window(skip: i64, limit: i64) -> (i64, i64) {
    let skip = skip.max(0);
    let limit = if limit <= 0 { 100 } else { limit };
    (skip, limit)
}

/// Row filter for file listings. All fields are ANDed; paging applies
/// after filtering.
#[derive(Debug, Clone, Default)]
pub struct FileFilter {
    pub skip: i64,
    pub limit: i64,
    pub patient_id: Option<i64>,
    pub medical_record_id: Option<i64>,
    pub file_type: Option<FileType>,
}

/// Relational store behind all services. Implementations must make
/// `create_files_batch` atomic: either every inserted row and every
/// re-association commits, or none of them do.
#[async_trait]
pub trait RecordStore: Send + Sync {
    // users
    async fn create_user(&self, new: NewUser) -> ApiResult<User>;
    async fn user_by_id(&self, id: i64) -> ApiResult<Option<User>>;
    async fn user_by_username(&self, username: &str) -> ApiResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> ApiResult<Option<User>>;
    async fn list_users_by_role(&self, role: Role, skip: i64, limit: i64)
        -> ApiResult<Vec<User>>;
    async fn set_user_active(&self, id: i64, active: bool) -> ApiResult<Option<User>>;

    // medical records
    async fn create_record(&self, new: NewMedicalRecord) -> ApiResult<MedicalRecord>;
    async fn record_by_id(&self, id: i64) -> ApiResult<Option<MedicalRecord>>;
    async fn list_records(
        &self,
        patient_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<MedicalRecord>>;
    /// Applies the non-`None` fields of `changes` and stamps
    /// `updated_at`. Returns `None` when the record does not exist.
    async fn update_record(
        &self,
        id: i64,
        changes: MedicalRecordUpdate,
    ) -> ApiResult<Option<MedicalRecord>>;
    /// Deletes the record row. File associations pointing at the record
    /// are cleared, never cascaded into file deletion.
    async fn delete_record(&self, id: i64) -> ApiResult<bool>;

    // uploaded files
    async fn file_by_id(&self, id: i64) -> ApiResult<Option<UploadedFile>>;
    async fn list_files(&self, filter: &FileFilter) -> ApiResult<Vec<UploadedFile>>;
    /// Inserts `rows` and re-points `medical_record_id` for each
    /// `(file_id, record_id)` pair in `reassociate`, all in one
    /// transaction. Re-association targets must exist and be photos.
    /// Returns inserted rows first (in input order), then the updated
    /// re-associated rows (in input order).
    async fn create_files_batch(
        &self,
        rows: Vec<NewUploadedFile>,
        reassociate: Vec<(i64, i64)>,
    ) -> ApiResult<Vec<UploadedFile>>;
    async fn delete_file(&self, id: i64) -> ApiResult<bool>;
    /// Distinct patients that own at least one uploaded file.
    async fn patients_with_files(&self) -> ApiResult<Vec<User>>;
}

#[cfg(test)]
mod tests {
    use super::page_window;

    #[test]
    fn should_clamp_hostile_paging() {
        assert_eq!(page_window(-1, -5), (0, 100));
        assert_eq!(page_window(-100, 0), (0, 100));
        assert_eq!(page_window(20, 50), (20, 50));
    }
}
