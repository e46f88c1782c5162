//! Domain service for the self-service account lifecycle.
//!
//! Covers sign-up, activation, sign-in, bearer-token authentication,
//! password reset and self-service profile updates.

use serde::Serialize;
use thiserror::Error;

use crate::db::Account;
use crate::domain::{LifecycleCode, RejectionCode};
use crate::validation::ValidationErrors;

/// Errors specific to account lifecycle operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The operation was refused with a stable result code the caller can
    /// relay as-is.
    #[error("{0}")]
    Rejected(RejectionCode),

    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No valid credential was presented.
    #[error("Unauthorized")]
    Unauthorized,

    /// The caller is authenticated but not allowed to act on the target.
    #[error("Forbidden")]
    Forbidden,

    #[error("Database error: {0}")]
    Database(String),

    /// The state change committed but the notice could not be delivered.
    #[error("Notice delivery failed: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AccountError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccountError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl AccountError {
    /// Convenience for single-field validation failures.
    #[must_use]
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_field(field, message);
        Self::Validation(errors)
    }

    #[must_use]
    pub fn non_field(code: &str) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add_non_field(code);
        Self::Validation(errors)
    }
}

/// Account view safe to hand back to callers. Never carries the password
/// hash or the bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub uuid: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: String,
    pub last_login: String,
}

impl From<Account> for AccountSummary {
    fn from(account: Account) -> Self {
        Self {
            uuid: account.uuid,
            email: account.email,
            first_name: account.first_name,
            last_name: account.last_name,
            is_active: account.is_active,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
            date_joined: account.date_joined,
            last_login: account.last_login,
        }
    }
}

/// Self-service registration input. The full name is split on the first
/// space after validation.
#[derive(Debug, Clone)]
pub struct SignUpRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Successful registration: the account plus its bearer token key.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpResult {
    pub token: String,
    pub account: AccountSummary,
}

/// Successful sign-in: the account plus its bearer token key.
#[derive(Debug, Clone, Serialize)]
pub struct SignInResult {
    pub token: String,
    pub account: AccountSummary,
}

/// Self-service detail update. All fields are required.
#[derive(Debug, Clone)]
pub struct UpdateDetailsRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Domain service trait for the account lifecycle.
#[async_trait::async_trait]
pub trait AccountService: Send + Sync {
    /// Register a new account. When activation is enforced the account is
    /// created inactive and an activation link is dispatched. The bearer
    /// token is returned immediately but only authenticates once the
    /// account is active.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Rejected`] with `SIGN_UP_DISABLED` when
    /// registration is switched off, or [`AccountError::Validation`] with
    /// every failing field reported.
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResult, AccountError>;

    /// Turn a pending account active using an activation token. Replaying
    /// the call on an already-active account is a benign no-op as long as
    /// the token still verifies.
    ///
    /// # Errors
    ///
    /// `USER_INVALID` for an unknown uuid, `TOKEN_INVALID` for a stale or
    /// foreign token.
    async fn activate(&self, uuid: &str, token: &str) -> Result<LifecycleCode, AccountError>;

    /// Re-issue and dispatch the activation link for a pending account.
    /// Keyed by uuid so the operation cannot be used to probe which email
    /// addresses are registered.
    async fn resend_activation_link(&self, uuid: &str) -> Result<LifecycleCode, AccountError>;

    /// Verify credentials and return the bearer token. Signing in refreshes
    /// the last-login timestamp, which invalidates outstanding
    /// activation/reset tokens.
    async fn sign_in(&self, credentials: Credentials) -> Result<SignInResult, AccountError>;

    /// Resolve a presented bearer token key to an active account.
    ///
    /// # Errors
    ///
    /// `TOKEN_INVALID` for an unknown key, `USER_INACTIVE` when the owner is
    /// not active.
    async fn authenticate(&self, token_key: &str) -> Result<AccountSummary, AccountError>;

    /// Dispatch a password reset link if the email belongs to an active
    /// account. Always reports `PASSWORD_RESET` so callers cannot probe
    /// which emails are registered.
    async fn request_password_reset(&self, email: &str) -> Result<LifecycleCode, AccountError>;

    /// Check a reset token without consuming it, so a form can be shown
    /// before the new password is submitted.
    async fn validate_reset_token(
        &self,
        uuid: &str,
        token: &str,
    ) -> Result<LifecycleCode, AccountError>;

    /// Set a new password through a reset token.
    async fn set_new_password(
        &self,
        uuid: &str,
        token: &str,
        password1: &str,
        password2: &str,
    ) -> Result<LifecycleCode, AccountError>;

    /// Change the password of an authenticated account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Validation`] when the current password does
    /// not match or the new password fails the rules.
    async fn change_password(
        &self,
        uuid: &str,
        current_password: &str,
        new_password1: &str,
        new_password2: &str,
    ) -> Result<LifecycleCode, AccountError>;

    /// Update the authenticated account's name and email.
    async fn update_details(
        &self,
        uuid: &str,
        request: UpdateDetailsRequest,
    ) -> Result<AccountSummary, AccountError>;
}
