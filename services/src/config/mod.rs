// services/src/config/mod.rs

pub mod config_helpers;
pub mod config_structs;

pub use config_helpers::load_config;
pub use config_structs::{ServerConfig, StorageBackend};
