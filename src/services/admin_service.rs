//! Domain service for administrative user management.
//!
//! Every operation takes the calling [`Principal`] and is checked against
//! the seeded `add_user` / `change_user` / `delete_user` permissions before
//! touching the target account.

use crate::db::AccountChangeset;
use crate::domain::LifecycleCode;
use crate::services::account_service::{AccountError, AccountSummary};
use crate::services::authorization::Principal;

/// Input for admin account creation. Accounts are created without a
/// password; the invitation flow lets the recipient set one.
#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub role_ids: Vec<i32>,
    pub permission_ids: Vec<i32>,
}

/// Domain service trait for the admin panel.
#[async_trait::async_trait]
pub trait AdminService: Send + Sync {
    /// Create an account on someone's behalf. Requires `add_user`.
    /// Privilege fields are honored only for superuser callers. When
    /// auto-invitation is enabled and the account is created active, a
    /// set-password invitation is dispatched.
    async fn create_user(
        &self,
        principal: &Principal,
        request: CreateUserRequest,
    ) -> Result<AccountSummary, AccountError>;

    /// Apply a partial update. Requires `change_user`. Privilege fields
    /// submitted by non-superusers are dropped silently. Flipping a
    /// passwordless account to active dispatches an invitation when
    /// auto-invitation is enabled.
    async fn update_user(
        &self,
        principal: &Principal,
        uuid: &str,
        changeset: AccountChangeset,
    ) -> Result<AccountSummary, AccountError>;

    /// Send (or resend) the set-password invitation. Requires `change_user`.
    async fn invite(&self, principal: &Principal, uuid: &str)
        -> Result<LifecycleCode, AccountError>;

    /// Set a user's password directly. Superuser only.
    async fn change_user_password(
        &self,
        principal: &Principal,
        uuid: &str,
        new_password1: &str,
        new_password2: &str,
    ) -> Result<LifecycleCode, AccountError>;

    /// Remove all two-factor devices from an account so the owner can
    /// re-enroll. Requires `change_user`.
    async fn disable_two_factor(
        &self,
        principal: &Principal,
        uuid: &str,
    ) -> Result<(), AccountError>;

    /// Delete an account and everything it owns. Requires `delete_user`.
    async fn delete_user(&self, principal: &Principal, uuid: &str) -> Result<(), AccountError>;

    /// List accounts. Requires `change_user`. Superuser accounts are
    /// omitted for non-superuser callers.
    async fn list_users(&self, principal: &Principal)
        -> Result<Vec<AccountSummary>, AccountError>;

    /// Fetch one account. Requires `change_user`; superuser targets are
    /// visible to superusers only.
    async fn get_user(
        &self,
        principal: &Principal,
        uuid: &str,
    ) -> Result<AccountSummary, AccountError>;
}
