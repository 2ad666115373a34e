// services/src/auth/credentials.rs
//! Salted password hashing. Stored form is `salt$hexdigest` where the
//! digest is SHA-256 over `salt || password`. The plaintext never leaves
//! this module's function arguments.
use sha2::{Digest, Sha256};
use uuid::Uuid;

fn digest_hex(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{}${}", salt, digest_hex(&salt, password))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest_hex(salt, password) == expected
}
