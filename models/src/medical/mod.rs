// models/src/medical/mod.rs

pub mod medical_record;
pub mod uploaded_file;
pub mod user;

pub use medical_record::{MedicalRecord, MedicalRecordUpdate, NewMedicalRecord};
pub use uploaded_file::{FileType, NewUploadedFile, UploadedFile};
pub use user::{NewUser, Role, User};
