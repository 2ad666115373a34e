// services/src/lib.rs
//! Core services for the clinic backend: access control, identity,
//! medical records, file association/upload, patient provisioning, plus
//! the storage traits and their Postgres / in-memory / disk backends.

pub mod access_control;
pub mod auth;
pub mod config;
pub mod storage_engine;

pub mod file_service;
pub mod medical_record_service;
pub mod patient_service;
pub mod user_service;

pub use access_control::{check, decide, Action, Decision, DenyReason, ResourceKind, ResourceRef};
pub use config::{load_config, ServerConfig, StorageBackend};
pub use file_service::{FileService, UploadPart};
pub use medical_record_service::MedicalRecordService;
pub use patient_service::PatientService;
pub use storage_engine::{BlobStore, DiskStore, MemoryBlobStore, MemoryStore, PostgresStore, RecordStore};
pub use user_service::UserService;
