// services/src/patient_service.rs
use std::sync::Arc;

use log::{info, warn};
use uuid::Uuid;

use models::errors::{ApiError, ApiResult};
use models::medical::medical_record::NewMedicalRecord;
use models::medical::user::{NewUser, Role, User};
use models::schemas::PatientCreateRequest;

use crate::auth::credentials::{hash_password, verify_password};
use crate::storage_engine::record_store::{page_window, RecordStore};

const USERNAME_ATTEMPTS: usize = 8;

/// Staff-initiated patient provisioning. Creating a patient account is a
/// sensitive operation: the acting doctor or admin must re-enter their
/// own password, and a mismatch is a Forbidden error (not a validation
/// error) so the response does not reveal whether the secret was
/// malformed or simply wrong.
#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn RecordStore>,
}

fn name_slug(s: &str) -> String {
    let slug: String = s
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if slug.is_empty() {
        "patient".to_string()
    } else {
        slug
    }
}

impl PatientService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        PatientService { store }
    }

    pub async fn create_patient(
        &self,
        actor: &User,
        req: PatientCreateRequest,
    ) -> ApiResult<User> {
        if !actor.role.is_staff() {
            return Err(ApiError::forbidden(
                "Only doctors and admins may create patient records",
            ));
        }
        if req.first_name.trim().is_empty() || req.last_name.trim().is_empty() {
            return Err(ApiError::validation("First and last name are required"));
        }
        if !verify_password(&req.admin_password, &actor.password_hash) {
            warn!(
                "Patient creation by {} rejected: confirmation password mismatch",
                actor.username
            );
            return Err(ApiError::forbidden("Password confirmation failed"));
        }

        let (username, email) = self
            .unique_username(&req.first_name, &req.last_name)
            .await?;
        // random initial credential; the patient resets it on first login
        let initial_password = Uuid::new_v4().simple().to_string();

        let patient = self
            .store
            .create_user(NewUser {
                username,
                email,
                password_hash: hash_password(&initial_password),
                first_name: req.first_name,
                last_name: req.last_name,
                phone: None,
                address: None,
                role: Role::Patient,
            })
            .await?;

        // an initial diagnosis becomes the patient's first record,
        // authored by the provisioning staff member
        if let Some(diagnosis) = req.initial_diagnosis {
            self.store
                .create_record(NewMedicalRecord {
                    patient_id: patient.id,
                    doctor_id: actor.id,
                    title: "Initial diagnosis".to_string(),
                    description: None,
                    diagnosis: Some(diagnosis),
                    treatment: None,
                    notes: None,
                })
                .await?;
        }

        info!(
            "Created patient {} (id {}) on behalf of {}",
            patient.username, patient.id, actor.username
        );
        Ok(patient)
    }

    /// Derives `first.last-xxxxxx` and retries with a fresh suffix on the
    /// rare collision.
    async fn unique_username(&self, first: &str, last: &str) -> ApiResult<(String, String)> {
        let base = format!("{}.{}", name_slug(first), name_slug(last));
        for _ in 0..USERNAME_ATTEMPTS {
            let suffix: String = Uuid::new_v4().simple().to_string()[..6].to_string();
            let username = format!("{}-{}", base, suffix);
            let email = format!("{}@patients.clinic.local", username);
            if self.store.user_by_username(&username).await?.is_none()
                && self.store.user_by_email(&email).await?.is_none()
            {
                return Ok((username, email));
            }
        }
        Err(ApiError::internal(
            "Could not derive a unique patient username",
        ))
    }

    /// Doctor/admin-gated paged listing of patient users.
    pub async fn list_patients(
        &self,
        actor: &User,
        skip: i64,
        limit: i64,
    ) -> ApiResult<Vec<User>> {
        if !actor.role.is_staff() {
            return Err(ApiError::forbidden("Only doctors and admins may list patients"));
        }
        let (skip, limit) = page_window(skip, limit);
        self.store.list_users_by_role(Role::Patient, skip, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::memory_store::MemoryStore;
    use chrono::Utc;

    fn actor(id: i64, role: Role, password: &str) -> User {
        User {
            id,
            username: format!("staff{}", id),
            email: format!("staff{}@clinic.test", id),
            password_hash: hash_password(password),
            first_name: "Staff".to_string(),
            last_name: "Member".to_string(),
            phone: None,
            address: None,
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn request() -> PatientCreateRequest {
        PatientCreateRequest {
            first_name: "María".to_string(),
            last_name: "Pérez".to_string(),
            initial_diagnosis: Some("Dermatitis".to_string()),
            admin_password: "hunter2".to_string(),
        }
    }

    #[tokio::test]
    async fn should_create_patient_with_generated_account() {
        let store = Arc::new(MemoryStore::new());
        let svc = PatientService::new(store.clone());
        let doctor = actor(2, Role::Doctor, "hunter2");

        let patient = svc.create_patient(&doctor, request()).await.unwrap();
        assert_eq!(patient.role, Role::Patient);
        assert!(patient.username.starts_with("mara.prez-"));
        assert!(patient.email.ends_with("@patients.clinic.local"));
    }

    #[tokio::test]
    async fn should_forbid_patient_actors() {
        let svc = PatientService::new(Arc::new(MemoryStore::new()));
        let patient_actor = actor(3, Role::Patient, "hunter2");
        let err = svc.create_patient(&patient_actor, request()).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_forbid_wrong_confirmation_password_and_create_nothing() {
        let store = Arc::new(MemoryStore::new());
        let svc = PatientService::new(store.clone());
        let doctor = actor(2, Role::Doctor, "hunter2");

        let mut req = request();
        req.admin_password = "wrong".to_string();
        let err = svc.create_patient(&doctor, req).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        // no user row came into existence
        let patients = store
            .list_users_by_role(Role::Patient, 0, 100)
            .await
            .unwrap();
        assert!(patients.is_empty());
    }

    #[tokio::test]
    async fn should_gate_patient_listing() {
        let store = Arc::new(MemoryStore::new());
        let svc = PatientService::new(store.clone());
        let doctor = actor(2, Role::Doctor, "hunter2");
        svc.create_patient(&doctor, request()).await.unwrap();

        assert_eq!(svc.list_patients(&doctor, 0, 100).await.unwrap().len(), 1);
        let patient_actor = actor(9, Role::Patient, "x");
        assert!(svc.list_patients(&patient_actor, 0, 100).await.is_err());
    }
}
