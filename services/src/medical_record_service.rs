// services/src/medical_record_service.rs
use std::sync::Arc;

use log::info;

use models::errors::{ApiError, ApiResult};
use models::medical::medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord};
use models::medical::user::{Role, User};
use models::schemas::{MedicalRecordCreateRequest, MedicalRecordUpdateRequest};

use crate::access_control::{check, Action, ResourceRef};
use crate::storage_engine::record_store::{page_window, RecordStore};

#[derive(Clone)]
pub struct MedicalRecordService {
    store: Arc<dyn RecordStore>,
}

impl MedicalRecordService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        MedicalRecordService { store }
    }

    pub async fn create(
        &self,
        actor: &User,
        req: MedicalRecordCreateRequest,
    ) -> ApiResult<MedicalRecord> {
        if !actor.role.is_staff() {
            return Err(ApiError::forbidden(
                "Only doctors and admins may author medical records",
            ));
        }
        if req.title.trim().is_empty() {
            return Err(ApiError::validation("Record title is required"));
        }
        let patient = self
            .store
            .user_by_id(req.patient_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Patient {} not found", req.patient_id)))?;
        if patient.role != Role::Patient {
            return Err(ApiError::validation(format!(
                "User {} is not a patient",
                patient.id
            )));
        }

        let record = self
            .store
            .create_record(NewMedicalRecord {
                patient_id: patient.id,
                doctor_id: actor.id,
                title: req.title,
                description: req.description,
                diagnosis: req.diagnosis,
                treatment: req.treatment,
                notes: req.notes,
            })
            .await?;
        info!(
            "Record {} created for patient {} by {}",
            record.id, record.patient_id, actor.username
        );
        Ok(record)
    }

    pub async fn get(&self, actor: &User, id: i64) -> ApiResult<MedicalRecord> {
        let record = self
            .store
            .record_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Medical record {} not found", id)))?;
        check(
            actor,
            Action::Read,
            &ResourceRef::record(record.patient_id, record.doctor_id),
        )?;
        Ok(record)
    }

    /// Role-scoped listing: staff see every patient's records (optionally
    /// filtered), patients only their own regardless of the filter given.
    pub async fn list(
        &self,
        actor: &User,
        patient_id: Option<i64>,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<MedicalRecord>> {
        let effective_patient = match actor.role {
            Role::Patient => Some(actor.id),
            Role::Doctor | Role::Admin => patient_id,
        };
        let (skip, limit) = page_window(skip, limit);
        self.store.list_records(effective_patient, skip, limit).await
    }

    /// Partial update of the record's clinical fields. Write-gated the
    /// same way as authoring; the patient and author bindings never
    /// change.
    pub async fn update(
        &self,
        actor: &User,
        id: i64,
        req: MedicalRecordUpdateRequest,
    ) -> ApiResult<MedicalRecord> {
        if !actor.role.is_staff() {
            return Err(ApiError::forbidden(
                "Only doctors and admins may edit medical records",
            ));
        }
        let record = self
            .store
            .record_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Medical record {} not found", id)))?;
        check(
            actor,
            Action::Write,
            &ResourceRef::record(record.patient_id, record.doctor_id),
        )?;
        if let Some(title) = &req.title {
            if title.trim().is_empty() {
                return Err(ApiError::validation("Record title cannot be empty"));
            }
        }

        let updated = self
            .store
            .update_record(
                id,
                MedicalRecordUpdate {
                    title: req.title,
                    description: req.description,
                    diagnosis: req.diagnosis,
                    treatment: req.treatment,
                    notes: req.notes,
                },
            )
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Medical record {} not found", id)))?;
        info!("Record {} updated by {}", id, actor.username);
        Ok(updated)
    }

    pub async fn delete(&self, actor: &User, id: i64) -> ApiResult<()> {
        let record = self
            .store
            .record_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("Medical record {} not found", id)))?;
        check(
            actor,
            Action::Delete,
            &ResourceRef::record(record.patient_id, record.doctor_id),
        )?;
        if !self.store.delete_record(id).await? {
            return Err(ApiError::not_found(format!(
                "Medical record {} not found",
                id
            )));
        }
        info!("Record {} deleted by {}", id, actor.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::credentials::hash_password;
    use crate::storage_engine::memory_store::MemoryStore;
    use crate::user_service::UserService;
    use models::schemas::RegisterRequest;

    async fn seeded() -> (MedicalRecordService, User, User, User) {
        let store = Arc::new(MemoryStore::new());
        let users = UserService::new(store.clone());
        let seed = |username: &str, role: Role| RegisterRequest {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            password: "pw".to_string(),
            first_name: "T".to_string(),
            last_name: "U".to_string(),
            phone: None,
            address: None,
            role,
        };
        let admin = users.register(seed("root", Role::Admin)).await.unwrap();
        let doctor = users.register(seed("doc", Role::Doctor)).await.unwrap();
        let patient = users.register(seed("pat", Role::Patient)).await.unwrap();
        (MedicalRecordService::new(store), admin, doctor, patient)
    }

    fn record_req(patient_id: i64) -> MedicalRecordCreateRequest {
        MedicalRecordCreateRequest {
            patient_id,
            title: "Consultation".to_string(),
            description: Some("Routine visit".to_string()),
            diagnosis: None,
            treatment: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn should_author_records_as_staff_only() {
        let (svc, _admin, doctor, patient) = seeded().await;
        let record = svc.create(&doctor, record_req(patient.id)).await.unwrap();
        assert_eq!(record.doctor_id, doctor.id);
        assert_eq!(record.patient_id, patient.id);

        let err = svc.create(&patient, record_req(patient.id)).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_reject_record_about_non_patient() {
        let (svc, admin, doctor, _patient) = seeded().await;
        let err = svc.create(&doctor, record_req(admin.id)).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn should_scope_listing_to_own_records_for_patients() {
        let (svc, _admin, doctor, patient) = seeded().await;
        svc.create(&doctor, record_req(patient.id)).await.unwrap();

        // the filter is ignored for patient actors
        let listed = svc.list(&patient, Some(999), 0, 100).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed.iter().all(|r| r.patient_id == patient.id));
    }

    #[tokio::test]
    async fn should_update_clinical_fields_only() {
        let (svc, _admin, doctor, patient) = seeded().await;
        let record = svc.create(&doctor, record_req(patient.id)).await.unwrap();

        let updated = svc
            .update(
                &doctor,
                record.id,
                MedicalRecordUpdateRequest {
                    diagnosis: Some("Sprained ankle".to_string()),
                    treatment: Some("Rest".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.diagnosis.as_deref(), Some("Sprained ankle"));
        assert_eq!(updated.treatment.as_deref(), Some("Rest"));
        // untouched fields and bindings survive
        assert_eq!(updated.title, record.title);
        assert_eq!(updated.patient_id, record.patient_id);
        assert_eq!(updated.doctor_id, record.doctor_id);
        assert!(updated.updated_at.is_some());
    }

    #[tokio::test]
    async fn should_gate_updates_like_authoring() {
        let (svc, _admin, doctor, patient) = seeded().await;
        let record = svc.create(&doctor, record_req(patient.id)).await.unwrap();

        let err = svc
            .update(
                &patient,
                record.id,
                MedicalRecordUpdateRequest {
                    notes: Some("self-edit".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = svc
            .update(
                &doctor,
                record.id,
                MedicalRecordUpdateRequest {
                    title: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn should_tolerate_negative_paging_values() {
        let (svc, _admin, doctor, patient) = seeded().await;
        svc.create(&doctor, record_req(patient.id)).await.unwrap();
        // hostile query strings must not reach the store as-is
        let listed = svc.list(&doctor, None, -1, -5).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn should_not_let_patient_delete_doctor_authored_record() {
        let (svc, _admin, doctor, patient) = seeded().await;
        let record = svc.create(&doctor, record_req(patient.id)).await.unwrap();
        let err = svc.delete(&patient, record.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        // the author may delete it
        svc.delete(&doctor, record.id).await.unwrap();
    }

    #[tokio::test]
    async fn should_read_gate_single_record() {
        let (svc, _admin, doctor, patient) = seeded().await;
        let record = svc.create(&doctor, record_req(patient.id)).await.unwrap();

        // hash_password only to build a plausible foreign patient actor
        let other = User {
            id: 999,
            username: "other".to_string(),
            email: "other@clinic.test".to_string(),
            password_hash: hash_password("pw"),
            first_name: "O".to_string(),
            last_name: "P".to_string(),
            phone: None,
            address: None,
            role: Role::Patient,
            is_active: true,
            created_at: chrono::Utc::now(),
            updated_at: None,
        };
        assert!(svc.get(&patient, record.id).await.is_ok());
        assert!(svc.get(&other, record.id).await.is_err());
    }
}
