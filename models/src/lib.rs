// models/src/lib.rs

// Declare all top-level modules within the 'models' crate
pub mod errors;
pub mod schemas;

// Declare the 'medical' sub-module
pub mod medical;

// Re-export common core types for convenience when other crates use 'models::*'
pub use errors::{ApiError, ApiResult};
pub use medical::user::{NewUser, Role, User};
pub use medical::medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord};
pub use medical::uploaded_file::{FileType, NewUploadedFile, UploadedFile};
