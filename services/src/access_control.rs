// services/src/access_control.rs
//! The single access-control decision point. Every route handler and
//! service funnels through `decide`; role checks are never repeated
//! inline elsewhere. Pure function, no I/O.
//!
//! Policy, first match wins:
//! 1. Admins may do anything.
//! 2. Doctors may read/write any patient's records and files, but delete
//!    only what they uploaded or authored themselves (doctor-wide delete
//!    is deliberately not enabled; see DESIGN.md).
//! 3. Patients may read their own resources, write their own (self
//!    upload), and delete only resources that are about them AND that
//!    they uploaded themselves. A patient can never delete a
//!    doctor-authored resource about them.
//! 4. Anything else is denied. Malformed resource references are denied
//!    with a distinguished invalid-request reason and never fall through
//!    to allow.

use models::errors::{ApiError, ApiResult};
use models::medical::user::{Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    MedicalRecord,
    UploadedFile,
}

/// The facts a decision needs about a resource: what it is, which patient
/// it is about, and who put it there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    /// The patient the resource is about (the resource owner).
    pub patient_id: i64,
    /// The user that uploaded the file or authored the record.
    pub uploader_id: i64,
}

impl ResourceRef {
    pub fn record(patient_id: i64, author_id: i64) -> Self {
        ResourceRef {
            kind: ResourceKind::MedicalRecord,
            patient_id,
            uploader_id: author_id,
        }
    }

    pub fn file(patient_id: i64, uploader_id: i64) -> Self {
        ResourceRef {
            kind: ResourceKind::UploadedFile,
            patient_id,
            uploader_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The role simply does not grant this action on this resource.
    NotPermitted,
    /// The resource reference itself is malformed (nonpositive ids).
    InvalidRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

pub fn decide(actor: &User, action: Action, resource: &ResourceRef) -> Decision {
    if resource.patient_id <= 0 || resource.uploader_id <= 0 {
        return Decision::Deny(DenyReason::InvalidRequest);
    }

    match actor.role {
        Role::Admin => Decision::Allow,
        Role::Doctor => match action {
            Action::Read | Action::Write => Decision::Allow,
            Action::Delete => {
                if resource.uploader_id == actor.id {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::NotPermitted)
                }
            }
        },
        Role::Patient => {
            if resource.patient_id != actor.id {
                return Decision::Deny(DenyReason::NotPermitted);
            }
            match action {
                Action::Read | Action::Write => Decision::Allow,
                Action::Delete => {
                    if resource.uploader_id == actor.id {
                        Decision::Allow
                    } else {
                        Decision::Deny(DenyReason::NotPermitted)
                    }
                }
            }
        }
    }
}

/// Convenience wrapper turning a denial into the error the API surfaces.
pub fn check(actor: &User, action: Action, resource: &ResourceRef) -> ApiResult<()> {
    match decide(actor, action, resource) {
        Decision::Allow => Ok(()),
        Decision::Deny(DenyReason::InvalidRequest) => Err(ApiError::validation(
            "Invalid resource reference".to_string(),
        )),
        Decision::Deny(DenyReason::NotPermitted) => Err(ApiError::forbidden(
            "You do not have permission to perform this action",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: i64, role: Role) -> User {
        User {
            id,
            username: format!("user{}", id),
            email: format!("user{}@clinic.test", id),
            password_hash: String::new(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
            address: None,
            role,
            is_active: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn admin_is_allowed_everything() {
        let admin = user(1, Role::Admin);
        for action in [Action::Read, Action::Write, Action::Delete] {
            assert!(decide(&admin, action, &ResourceRef::file(42, 43)).is_allowed());
            assert!(decide(&admin, action, &ResourceRef::record(42, 43)).is_allowed());
        }
    }

    #[test]
    fn doctor_reads_and_writes_any_patient() {
        let doctor = user(2, Role::Doctor);
        assert!(decide(&doctor, Action::Read, &ResourceRef::file(42, 99)).is_allowed());
        assert!(decide(&doctor, Action::Write, &ResourceRef::record(42, 99)).is_allowed());
    }

    #[test]
    fn doctor_deletes_only_own_uploads() {
        let doctor = user(2, Role::Doctor);
        assert!(decide(&doctor, Action::Delete, &ResourceRef::file(42, 2)).is_allowed());
        assert_eq!(
            decide(&doctor, Action::Delete, &ResourceRef::file(42, 3)),
            Decision::Deny(DenyReason::NotPermitted)
        );
    }

    #[test]
    fn patient_reads_only_own_resources() {
        let patient = user(42, Role::Patient);
        assert!(decide(&patient, Action::Read, &ResourceRef::file(42, 2)).is_allowed());
        assert_eq!(
            decide(&patient, Action::Read, &ResourceRef::file(43, 2)),
            Decision::Deny(DenyReason::NotPermitted)
        );
    }

    #[test]
    fn patient_writes_only_own_resources() {
        let patient = user(42, Role::Patient);
        assert!(decide(&patient, Action::Write, &ResourceRef::file(42, 42)).is_allowed());
        assert_eq!(
            decide(&patient, Action::Write, &ResourceRef::file(43, 42)),
            Decision::Deny(DenyReason::NotPermitted)
        );
    }

    #[test]
    fn patient_cannot_delete_doctor_authored_resource_about_them() {
        let patient = user(42, Role::Patient);
        // doctor 2 uploaded a document about patient 42
        assert_eq!(
            decide(&patient, Action::Delete, &ResourceRef::file(42, 2)),
            Decision::Deny(DenyReason::NotPermitted)
        );
        // but may delete a self-upload
        assert!(decide(&patient, Action::Delete, &ResourceRef::file(42, 42)).is_allowed());
    }

    #[test]
    fn malformed_reference_is_invalid_request_never_allow() {
        let admin = user(1, Role::Admin);
        assert_eq!(
            decide(&admin, Action::Read, &ResourceRef::file(0, 1)),
            Decision::Deny(DenyReason::InvalidRequest)
        );
        assert_eq!(
            decide(&admin, Action::Read, &ResourceRef::file(1, -5)),
            Decision::Deny(DenyReason::InvalidRequest)
        );
    }

    #[test]
    fn check_maps_denials_to_errors() {
        let patient = user(42, Role::Patient);
        let err = check(&patient, Action::Read, &ResourceRef::file(43, 2)).unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        let err = check(&patient, Action::Read, &ResourceRef::file(0, 2)).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
