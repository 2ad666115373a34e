// models/src/medical/medical_record.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A clinical record entry. References exactly one patient (role must be
/// patient) and exactly one author (doctor or admin). Files associated
/// with a record are linked weakly from the files side; dropping a record
/// clears the association and never deletes the files themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewMedicalRecord {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for a record. `None` fields keep their stored value;
/// patient and author bindings are immutable.
#[derive(Debug, Clone, Default)]
pub struct MedicalRecordUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub notes: Option<String>,
}
