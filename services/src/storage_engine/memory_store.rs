// services/src/storage_engine/memory_store.rs
//! In-process record store. Used by the unit tests and by the `memory`
//! storage backend for running the server without a database. Mirrors the
//! transactional contract of the Postgres backend by validating a whole
//! batch before applying any of it.
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use models::errors::{ApiError, ApiResult};
use models::medical::medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord};
use models::medical::uploaded_file::{FileType, NewUploadedFile, UploadedFile};
use models::medical::user::{NewUser, Role, User};

use crate::storage_engine::record_store::{FileFilter, RecordStore};

#[derive(Debug, Default)]
struct MemoryInner {
    users: HashMap<i64, User>,
    records: HashMap<i64, MedicalRecord>,
    files: HashMap<i64, UploadedFile>,
    next_user_id: i64,
    next_record_id: i64,
    next_file_id: i64,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

fn page<T: Clone>(mut items: Vec<T>, skip: i64, limit: i64) -> Vec<T> {
    let skip = skip.max(0) as usize;
    let limit = if limit <= 0 { usize::MAX } else { limit as usize };
    if skip >= items.len() {
        return Vec::new();
    }
    items.drain(..skip);
    items.truncate(limit);
    items
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> ApiResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.values().any(|u| u.username == new.username) {
            return Err(ApiError::conflict("Username is already registered"));
        }
        if inner.users.values().any(|u| u.email == new.email) {
            return Err(ApiError::conflict("Email is already registered"));
        }
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            phone: new.phone,
            address: new.address,
            role: new.role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, id: i64) -> ApiResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn user_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn list_users_by_role(
        &self,
        role: Role,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| u.role == role)
            .cloned()
            .collect();
        users.sort_by_key(|u| u.id);
        Ok(page(users, skip, limit))
    }

    async fn set_user_active(&self, id: i64, active: bool) -> ApiResult<Option<User>> {
        let mut inner = self.inner.write().await;
        match inner.users.get_mut(&id) {
            Some(user) => {
                user.is_active = active;
                user.updated_at = Some(Utc::now());
                Ok(Some(user.clone()))
            }
            None => Ok(None),
        }
    }

    async fn create_record(&self, new: NewMedicalRecord) -> ApiResult<MedicalRecord> {
        let mut inner = self.inner.write().await;
        inner.next_record_id += 1;
        let record = MedicalRecord {
            id: inner.next_record_id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            title: new.title,
            description: new.description,
            diagnosis: new.diagnosis,
            treatment: new.treatment,
            notes: new.notes,
            created_at: Utc::now(),
            updated_at: None,
        };
        inner.records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn record_by_id(&self, id: i64) -> ApiResult<Option<MedicalRecord>> {
        Ok(self.inner.read().await.records.get(&id).cloned())
    }

    async fn list_records(
        &self,
        patient_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<MedicalRecord>> {
        let inner = self.inner.read().await;
        let mut records: Vec<MedicalRecord> = inner
            .records
            .values()
            .filter(|r| patient_id.map_or(true, |pid| r.patient_id == pid))
            .cloned()
            .collect();
        records.sort_by_key(|r| r.id);
        Ok(page(records, skip, limit))
    }

    async fn update_record(
        &self,
        id: i64,
        changes: MedicalRecordUpdate,
    ) -> ApiResult<Option<MedicalRecord>> {
        let mut inner = self.inner.write().await;
        match inner.records.get_mut(&id) {
            Some(record) => {
                if let Some(title) = changes.title {
                    record.title = title;
                }
                if let Some(description) = changes.description {
                    record.description = Some(description);
                }
                if let Some(diagnosis) = changes.diagnosis {
                    record.diagnosis = Some(diagnosis);
                }
                if let Some(treatment) = changes.treatment {
                    record.treatment = Some(treatment);
                }
                if let Some(notes) = changes.notes {
                    record.notes = Some(notes);
                }
                record.updated_at = Some(Utc::now());
                Ok(Some(record.clone()))
            }
            None => Ok(None),
        }
    }

    async fn delete_record(&self, id: i64) -> ApiResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.records.remove(&id).is_none() {
            return Ok(false);
        }
        // weak association: detach files, never delete them
        for file in inner.files.values_mut() {
            if file.medical_record_id == Some(id) {
                file.medical_record_id = None;
            }
        }
        Ok(true)
    }

    async fn file_by_id(&self, id: i64) -> ApiResult<Option<UploadedFile>> {
        Ok(self.inner.read().await.files.get(&id).cloned())
    }

    async fn list_files(&self, filter: &FileFilter) -> ApiResult<Vec<UploadedFile>> {
        let inner = self.inner.read().await;
        let mut files: Vec<UploadedFile> = inner
            .files
            .values()
            .filter(|f| filter.patient_id.map_or(true, |pid| f.patient_id == pid))
            .filter(|f| {
                filter
                    .medical_record_id
                    .map_or(true, |rid| f.medical_record_id == Some(rid))
            })
            .filter(|f| filter.file_type.map_or(true, |ft| f.file_type == ft))
            .cloned()
            .collect();
        files.sort_by_key(|f| f.id);
        Ok(page(files, filter.skip, filter.limit))
    }

    async fn create_files_batch(
        &self,
        rows: Vec<NewUploadedFile>,
        reassociate: Vec<(i64, i64)>,
    ) -> ApiResult<Vec<UploadedFile>> {
        let mut inner = self.inner.write().await;

        // validate the whole batch before touching anything
        for (file_id, record_id) in &reassociate {
            let file = inner
                .files
                .get(file_id)
                .ok_or_else(|| ApiError::not_found(format!("Photo {} not found", file_id)))?;
            if file.file_type != FileType::Photo {
                return Err(ApiError::validation(format!(
                    "File {} is not a photo and cannot be re-associated",
                    file_id
                )));
            }
            if !inner.records.contains_key(record_id) {
                return Err(ApiError::not_found(format!(
                    "Medical record {} not found",
                    record_id
                )));
            }
        }
        for record_id in rows.iter().filter_map(|r| r.medical_record_id) {
            if !inner.records.contains_key(&record_id) {
                return Err(ApiError::not_found(format!(
                    "Medical record {} not found",
                    record_id
                )));
            }
        }

        let mut result = Vec::with_capacity(rows.len() + reassociate.len());
        for new in rows {
            inner.next_file_id += 1;
            let file = UploadedFile {
                id: inner.next_file_id,
                filename: new.filename,
                original_filename: new.original_filename,
                file_size: new.file_size,
                mime_type: new.mime_type,
                description: new.description,
                file_type: new.file_type,
                user_id: new.user_id,
                patient_id: new.patient_id,
                medical_record_id: new.medical_record_id,
                created_at: Utc::now(),
            };
            inner.files.insert(file.id, file.clone());
            result.push(file);
        }
        for (file_id, record_id) in reassociate {
            let file = inner
                .files
                .get_mut(&file_id)
                .ok_or_else(|| ApiError::not_found(format!("Photo {} not found", file_id)))?;
            file.medical_record_id = Some(record_id);
            result.push(file.clone());
        }
        Ok(result)
    }

    async fn delete_file(&self, id: i64) -> ApiResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.files.remove(&id).is_some())
    }

    async fn patients_with_files(&self) -> ApiResult<Vec<User>> {
        let inner = self.inner.read().await;
        let mut ids: Vec<i64> = inner.files.values().map(|f| f.patient_id).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids
            .into_iter()
            .filter_map(|id| inner.users.get(&id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, role: Role) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            password_hash: "salt$hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
            address: None,
            role,
        }
    }

    fn new_file(patient_id: i64, user_id: i64, file_type: FileType) -> NewUploadedFile {
        NewUploadedFile {
            filename: "abc.bin".to_string(),
            original_filename: "scan.bin".to_string(),
            file_size: 3,
            mime_type: "application/octet-stream".to_string(),
            description: None,
            file_type,
            user_id,
            patient_id,
            medical_record_id: None,
        }
    }

    #[tokio::test]
    async fn should_reject_duplicate_username() {
        let store = MemoryStore::new();
        store.create_user(new_user("ana", Role::Patient)).await.unwrap();
        let err = store
            .create_user(new_user("ana", Role::Patient))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[tokio::test]
    async fn should_fail_whole_batch_on_bad_reassociation() {
        let store = MemoryStore::new();
        let rows = vec![new_file(1, 2, FileType::Photo)];
        let err = store
            .create_files_batch(rows, vec![(999, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        // nothing was inserted
        assert!(store.list_files(&FileFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_detach_files_when_record_deleted() {
        let store = MemoryStore::new();
        let record = store
            .create_record(NewMedicalRecord {
                patient_id: 1,
                doctor_id: 2,
                title: "Checkup".to_string(),
                description: None,
                diagnosis: None,
                treatment: None,
                notes: None,
            })
            .await
            .unwrap();
        let mut row = new_file(1, 2, FileType::MedicalRecordDocument);
        row.medical_record_id = Some(record.id);
        let created = store.create_files_batch(vec![row], vec![]).await.unwrap();

        assert!(store.delete_record(record.id).await.unwrap());
        let file = store.file_by_id(created[0].id).await.unwrap().unwrap();
        assert_eq!(file.medical_record_id, None);
    }
}
