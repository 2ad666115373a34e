// services/src/file_service.rs
//! File association and upload. Binds stored content to the patient it is
//! about, the uploader, and optionally a medical record. A batch upload
//! is atomic: metadata rows commit in one store transaction, and on any
//! failure every blob already written for the batch is removed again.
use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};

use models::errors::{ApiError, ApiResult};
use models::medical::uploaded_file::{FileType, NewUploadedFile, UploadedFile};
use models::medical::user::{Role, User};
use models::schemas::FileListQuery;

use crate::access_control::{check, decide, Action, Decision, ResourceRef};
use crate::storage_engine::blob_store::BlobStore;
use crate::storage_engine::record_store::{page_window, FileFilter, RecordStore};

/// One file of a multipart upload, as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub bytes: Vec<u8>,
    pub original_name: String,
    pub mime_type: String,
}

#[derive(Clone)]
pub struct FileService {
    store: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    max_file_size: i64,
    allowed_extensions: Vec<String>,
}

impl FileService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        max_file_size: i64,
        allowed_extensions: Vec<String>,
    ) -> Self {
        FileService {
            store,
            blobs,
            max_file_size,
            allowed_extensions: allowed_extensions
                .into_iter()
                .map(|e| e.to_ascii_lowercase())
                .collect(),
        }
    }

    fn validate_part(&self, part: &UploadPart) -> ApiResult<()> {
        let ext = Path::new(&part.original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !self.allowed_extensions.iter().any(|a| *a == ext) {
            return Err(ApiError::validation(format!(
                "File type not allowed. Allowed types: {}",
                self.allowed_extensions.join(", ")
            )));
        }
        if part.bytes.len() as i64 > self.max_file_size {
            return Err(ApiError::validation(format!(
                "File is too large. Maximum size: {:.1}MB",
                self.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }
        Ok(())
    }

    /// Uploads a batch of files for one patient, optionally linking the
    /// non-photo files to a medical record and re-associating existing
    /// photos with it. Descriptions pair positionally; missing ones are
    /// None, extra ones are ignored.
    pub async fn upload_batch(
        &self,
        actor: &User,
        patient_id: i64,
        parts: Vec<UploadPart>,
        descriptions: Vec<String>,
        medical_record_id: Option<i64>,
        photo_ids: Vec<i64>,
    ) -> ApiResult<Vec<UploadedFile>> {
        if parts.is_empty() && photo_ids.is_empty() {
            return Err(ApiError::validation("No files given"));
        }

        let patient = self
            .store
            .user_by_id(patient_id)
            .await?
            .filter(|u| u.role == Role::Patient && u.is_active)
            .ok_or_else(|| ApiError::not_found(format!("Patient {} not found", patient_id)))?;

        check(actor, Action::Write, &ResourceRef::file(patient.id, actor.id))?;

        // reject the whole batch before a single byte is stored
        for part in &parts {
            self.validate_part(part)?;
        }
        if let Some(record_id) = medical_record_id {
            let record = self
                .store
                .record_by_id(record_id)
                .await?
                .ok_or_else(|| {
                    ApiError::not_found(format!("Medical record {} not found", record_id))
                })?;
            if record.patient_id != patient.id {
                return Err(ApiError::validation(format!(
                    "Medical record {} does not belong to patient {}",
                    record_id, patient.id
                )));
            }
        }
        let reassociate: Vec<(i64, i64)> = match medical_record_id {
            Some(record_id) => {
                let mut pairs = Vec::with_capacity(photo_ids.len());
                for photo_id in &photo_ids {
                    let photo = self.store.file_by_id(*photo_id).await?.ok_or_else(|| {
                        ApiError::not_found(format!("Photo {} not found", photo_id))
                    })?;
                    // the actor must be allowed to write the photo itself,
                    // not just the batch's target patient
                    check(
                        actor,
                        Action::Write,
                        &ResourceRef::file(photo.patient_id, photo.user_id),
                    )?;
                    if photo.file_type != FileType::Photo {
                        return Err(ApiError::validation(format!(
                            "File {} is not a photo and cannot be re-associated",
                            photo_id
                        )));
                    }
                    if photo.patient_id != patient.id {
                        return Err(ApiError::validation(format!(
                            "Photo {} does not belong to patient {}",
                            photo_id, patient.id
                        )));
                    }
                    pairs.push((photo.id, record_id));
                }
                pairs
            }
            None if photo_ids.is_empty() => Vec::new(),
            None => {
                return Err(ApiError::validation(
                    "photo_ids requires a medical_record_id to associate with",
                ));
            }
        };

        // content first; every written locator is tracked for cleanup
        let mut written: Vec<String> = Vec::with_capacity(parts.len());
        for part in &parts {
            match self.blobs.write(&part.original_name, &part.bytes).await {
                Ok(locator) => written.push(locator),
                Err(e) => {
                    error!("Batch upload aborted while storing content: {}", e);
                    self.cleanup_blobs(&written).await;
                    return Err(e);
                }
            }
        }

        let rows: Vec<NewUploadedFile> = parts
            .iter()
            .zip(written.iter())
            .enumerate()
            .map(|(i, (part, locator))| {
                let file_type = FileType::from_mime(&part.mime_type);
                NewUploadedFile {
                    filename: locator.clone(),
                    original_filename: part.original_name.clone(),
                    file_size: part.bytes.len() as i64,
                    mime_type: part.mime_type.clone(),
                    description: descriptions.get(i).cloned(),
                    file_type,
                    user_id: actor.id,
                    patient_id: patient.id,
                    // photos stand alone; documents link to the record
                    medical_record_id: medical_record_id
                        .filter(|_| file_type == FileType::MedicalRecordDocument),
                }
            })
            .collect();

        match self.store.create_files_batch(rows, reassociate).await {
            Ok(files) => {
                info!(
                    "Uploaded {} file(s) for patient {} by {}",
                    files.len(),
                    patient.id,
                    actor.username
                );
                Ok(files)
            }
            Err(e) => {
                // metadata did not commit; remove the batch's content
                self.cleanup_blobs(&written).await;
                Err(e)
            }
        }
    }

    async fn cleanup_blobs(&self, locators: &[String]) {
        for locator in locators {
            if let Err(e) = self.blobs.remove(locator).await {
                // nothing references these blobs; log and move on
                warn!("Failed to clean up blob {}: {}", locator, e);
            }
        }
    }

    /// Filtered listing. Rows the actor cannot read are silently omitted,
    /// never surfaced as errors.
    pub async fn list(&self, actor: &User, query: &FileListQuery) -> ApiResult<Vec<UploadedFile>> {
        let (skip, limit) = page_window(query.skip, query.limit);
        let filter = FileFilter {
            skip,
            limit,
            patient_id: query.patient_id,
            medical_record_id: query.medical_record_id,
            file_type: query.file_type,
        };
        let files = self.store.list_files(&filter).await?;
        Ok(files
            .into_iter()
            .filter(|f| {
                decide(
                    actor,
                    Action::Read,
                    &ResourceRef::file(f.patient_id, f.user_id),
                ) == Decision::Allow
            })
            .collect())
    }

    pub async fn get(&self, actor: &User, id: i64) -> ApiResult<UploadedFile> {
        let file = self
            .store
            .file_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("File {} not found", id)))?;
        check(
            actor,
            Action::Read,
            &ResourceRef::file(file.patient_id, file.user_id),
        )?;
        Ok(file)
    }

    /// Read-gated content fetch for download: metadata plus the bytes.
    pub async fn download(&self, actor: &User, id: i64) -> ApiResult<(UploadedFile, Vec<u8>)> {
        let file = self.get(actor, id).await?;
        let bytes = self.blobs.read(&file.filename).await?;
        Ok((file, bytes))
    }

    /// Removes the stored content and the metadata row together.
    pub async fn delete(&self, actor: &User, id: i64) -> ApiResult<()> {
        let file = self
            .store
            .file_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("File {} not found", id)))?;
        check(
            actor,
            Action::Delete,
            &ResourceRef::file(file.patient_id, file.user_id),
        )?;

        if !self.store.delete_file(id).await? {
            return Err(ApiError::not_found(format!("File {} not found", id)));
        }
        // row is gone; a leftover blob would be orphaned, so removal
        // failures are logged loudly but do not resurrect the row
        if let Err(e) = self.blobs.remove(&file.filename).await {
            error!("File {} deleted but blob {} remains: {}", id, file.filename, e);
        }
        info!("File {} deleted by {}", id, actor.username);
        Ok(())
    }

    /// Patients that have at least one file. Staff only.
    pub async fn patients_with_files(&self, actor: &User) -> ApiResult<Vec<User>> {
        if !actor.role.is_staff() {
            return Err(ApiError::forbidden(
                "Only doctors and admins may list patients with files",
            ));
        }
        self.store.patients_with_files().await
    }
}
