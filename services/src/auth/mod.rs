// services/src/auth/mod.rs

pub mod credentials;
pub mod tokens;

pub use credentials::{hash_password, verify_password};
pub use tokens::{Claims, TokenService};
