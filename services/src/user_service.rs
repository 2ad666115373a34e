// services/src/user_service.rs
use std::sync::Arc;

use log::{info, warn};

use models::errors::{ApiError, ApiResult};
use models::medical::user::{NewUser, Role, User};
use models::schemas::RegisterRequest;

use crate::auth::credentials::{hash_password, verify_password};
use crate::storage_engine::record_store::RecordStore;

/// Identity store: user lookup, registration, credential checks and
/// soft-deletion via the active flag. Users are never hard-deleted.
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn RecordStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        UserService { store }
    }

    pub async fn get(&self, id: i64) -> ApiResult<Option<User>> {
        self.store.user_by_id(id).await
    }

    pub async fn get_required(&self, id: i64) -> ApiResult<User> {
        self.store
            .user_by_id(id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", id)))
    }

    pub async fn get_by_username(&self, username: &str) -> ApiResult<Option<User>> {
        self.store.user_by_username(username).await
    }

    pub async fn register(&self, req: RegisterRequest) -> ApiResult<User> {
        if req.username.trim().is_empty() || req.password.is_empty() {
            return Err(ApiError::validation("Username and password are required"));
        }
        if self.store.user_by_username(&req.username).await?.is_some() {
            return Err(ApiError::conflict("Username is already registered"));
        }
        if self.store.user_by_email(&req.email).await?.is_some() {
            return Err(ApiError::conflict("Email is already registered"));
        }

        let user = self
            .store
            .create_user(NewUser {
                username: req.username,
                email: req.email,
                password_hash: hash_password(&req.password),
                first_name: req.first_name,
                last_name: req.last_name,
                phone: req.phone,
                address: req.address,
                role: req.role,
            })
            .await?;
        info!("Registered user {} ({})", user.username, user.role);
        Ok(user)
    }

    /// Password login. The same error covers unknown user and wrong
    /// password so the response does not reveal which one it was.
    pub async fn authenticate(&self, username: &str, password: &str) -> ApiResult<User> {
        let user = self.store.user_by_username(username).await?;
        let Some(user) = user else {
            warn!("Login failed for unknown username {}", username);
            return Err(ApiError::unauthorized("Incorrect username or password"));
        };
        if !verify_password(password, &user.password_hash) {
            warn!("Login failed for user {}", username);
            return Err(ApiError::unauthorized("Incorrect username or password"));
        }
        if !user.is_active {
            return Err(ApiError::unauthorized("User is inactive"));
        }
        Ok(user)
    }

    /// Re-authentication step for sensitive operations: verifies the
    /// actor's own current credential.
    pub fn verify_credential(&self, user: &User, secret: &str) -> bool {
        verify_password(secret, &user.password_hash)
    }

    /// Soft delete. Admin only.
    pub async fn deactivate(&self, actor: &User, user_id: i64) -> ApiResult<User> {
        if actor.role != Role::Admin {
            return Err(ApiError::forbidden("Only admins may deactivate users"));
        }
        let user = self
            .store
            .set_user_active(user_id, false)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("User {} not found", user_id)))?;
        info!("Deactivated user {}", user.username);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::memory_store::MemoryStore;

    fn register_req(username: &str, role: Role) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: format!("{}@clinic.test", username),
            password: "s3cret".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone: None,
            address: None,
            role,
        }
    }

    fn service() -> UserService {
        UserService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn should_register_and_authenticate() {
        let svc = service();
        let user = svc.register(register_req("ana", Role::Patient)).await.unwrap();
        assert_eq!(user.role, Role::Patient);
        assert!(user.is_active);

        let back = svc.authenticate("ana", "s3cret").await.unwrap();
        assert_eq!(back.id, user.id);
    }

    #[tokio::test]
    async fn should_not_reveal_which_credential_was_wrong() {
        let svc = service();
        svc.register(register_req("ana", Role::Patient)).await.unwrap();

        let unknown = svc.authenticate("nobody", "s3cret").await.unwrap_err();
        let wrong = svc.authenticate("ana", "nope").await.unwrap_err();
        assert_eq!(unknown, wrong);
    }

    #[tokio::test]
    async fn should_reject_inactive_user_login() {
        let svc = service();
        let admin = svc.register(register_req("root", Role::Admin)).await.unwrap();
        let user = svc.register(register_req("ana", Role::Patient)).await.unwrap();
        svc.deactivate(&admin, user.id).await.unwrap();
        let err = svc.authenticate("ana", "s3cret").await.unwrap_err();
        assert_eq!(err, ApiError::unauthorized("User is inactive"));
    }

    #[tokio::test]
    async fn should_gate_deactivation_to_admins() {
        let svc = service();
        let doctor = svc.register(register_req("doc", Role::Doctor)).await.unwrap();
        let user = svc.register(register_req("ana", Role::Patient)).await.unwrap();
        let err = svc.deactivate(&doctor, user.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[tokio::test]
    async fn should_conflict_on_duplicate_registration() {
        let svc = service();
        svc.register(register_req("ana", Role::Patient)).await.unwrap();
        let err = svc.register(register_req("ana", Role::Patient)).await.unwrap_err();
        assert!(matches!(err, ApiError::Conflict(_)));
    }
}
