//! `SeaORM` implementation of the `AdminService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::info;

use crate::config::Config;
use crate::db::repositories::account::hash_password;
use crate::db::{Account, AccountChangeset, NewAccount, Store};
use crate::domain::{LifecycleCode, RejectionCode, TokenPurpose};
use crate::notify::{Notice, NoticeKind, Notifier};
use crate::services::account_service::{AccountError, AccountSummary};
use crate::services::admin_service::{AdminService, CreateUserRequest};
use crate::services::authorization::{
    AdminPermission, Principal, ensure_can_target, ensure_staff_with, sanitize_changeset,
};
use crate::token::TokenService;
use crate::validation::{
    self, ValidationErrors, email_error, first_name_error, last_name_error, password_code_error,
};

pub struct SeaOrmAdminService {
    store: Store,
    config: Config,
    tokens: TokenService,
    notifier: Arc<dyn Notifier>,
}

impl SeaOrmAdminService {
    #[must_use]
    pub fn new(store: Store, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let tokens = TokenService::new(&config.security);
        Self {
            store,
            config,
            tokens,
            notifier,
        }
    }

    async fn require_target(
        &self,
        principal: &Principal,
        uuid: &str,
    ) -> Result<Account, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;
        ensure_can_target(principal, &account)?;
        Ok(account)
    }

    /// Invitation link. Set-password tokens double as invitations: the
    /// recipient follows the link and chooses their first password.
    async fn send_invitation(&self, account: &Account) -> Result<(), AccountError> {
        let token = self.tokens.issue(account, TokenPurpose::PasswordReset);
        let url = format!(
            "{}/reset-password/{}/{token}",
            self.config.notices.site_url, account.uuid
        );

        self.notifier
            .send(Notice {
                kind: NoticeKind::Invitation,
                recipient: account.email.clone(),
                first_name: account.first_name.clone(),
                url,
            })
            .await
            .map_err(|e| AccountError::Notification(e.to_string()))
    }

    fn validate_names_and_email(request: &CreateUserRequest) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if let Some(message) = first_name_error(&request.first_name) {
            errors.add_field("first_name", message);
        }
        if let Some(message) = last_name_error(&request.last_name) {
            errors.add_field("last_name", message);
        }
        if let Some(message) = email_error(&request.email) {
            errors.add_field("email", message);
        }
        errors
    }
}

#[async_trait]
impl AdminService for SeaOrmAdminService {
    async fn create_user(
        &self,
        principal: &Principal,
        request: CreateUserRequest,
    ) -> Result<AccountSummary, AccountError> {
        ensure_staff_with(principal, AdminPermission::AddUser)?;

        let mut errors = Self::validate_names_and_email(&request);
        if !errors.field_errors.contains_key("email")
            && self.store.email_taken(&request.email, None).await?
        {
            errors.add_field("email", validation::EMAIL_TAKEN);
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let grant_privileges = principal.is_superuser;

        let (account, _token_key) = self
            .store
            .create_account(NewAccount {
                email: request.email,
                password_hash: String::new(),
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                is_active: request.is_active,
                is_staff: grant_privileges && request.is_staff,
                is_superuser: grant_privileges && request.is_superuser,
            })
            .await?;

        if grant_privileges && !(request.role_ids.is_empty() && request.permission_ids.is_empty())
        {
            self.store
                .apply_account_changeset(
                    account.id,
                    &AccountChangeset {
                        role_ids: Some(request.role_ids),
                        permission_ids: Some(request.permission_ids),
                        ..Default::default()
                    },
                )
                .await?;
        }

        info!(uuid = %account.uuid, by = %principal.uuid, "Account created by admin");

        if self.config.features.auto_send_invitation && account.is_active {
            self.send_invitation(&account).await?;
        }

        Ok(AccountSummary::from(account))
    }

    async fn update_user(
        &self,
        principal: &Principal,
        uuid: &str,
        changeset: AccountChangeset,
    ) -> Result<AccountSummary, AccountError> {
        ensure_staff_with(principal, AdminPermission::ChangeUser)?;
        let account = self.require_target(principal, uuid).await?;

        let changeset = sanitize_changeset(principal, changeset);

        let mut errors = ValidationErrors::new();
        if let Some(first_name) = &changeset.first_name {
            if let Some(message) = first_name_error(first_name) {
                errors.add_field("first_name", message);
            }
        }
        if let Some(last_name) = &changeset.last_name {
            if let Some(message) = last_name_error(last_name) {
                errors.add_field("last_name", message);
            }
        }
        if let Some(email) = &changeset.email {
            if let Some(message) = email_error(email) {
                errors.add_field("email", message);
            } else if self.store.email_taken(email, Some(account.id)).await? {
                errors.add_field("email", validation::EMAIL_TAKEN);
            }
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let became_active = changeset.is_active == Some(true) && !account.is_active;

        let updated = self
            .store
            .apply_account_changeset(account.id, &changeset)
            .await?;

        if self.config.features.auto_send_invitation && became_active && !updated.has_password() {
            self.send_invitation(&updated).await?;
        }

        Ok(AccountSummary::from(updated))
    }

    async fn invite(
        &self,
        principal: &Principal,
        uuid: &str,
    ) -> Result<LifecycleCode, AccountError> {
        ensure_staff_with(principal, AdminPermission::ChangeUser)?;
        let account = self.require_target(principal, uuid).await?;

        // Only pending invitees get a link. A live set-password link for an
        // account that already holds credentials would bypass them.
        if !account.is_active {
            return Err(AccountError::Rejected(RejectionCode::UserInactive));
        }
        if account.has_password() {
            return Err(AccountError::Rejected(RejectionCode::UserActive));
        }

        self.send_invitation(&account).await?;

        Ok(LifecycleCode::ActivationSent)
    }

    async fn change_user_password(
        &self,
        principal: &Principal,
        uuid: &str,
        new_password1: &str,
        new_password2: &str,
    ) -> Result<LifecycleCode, AccountError> {
        // Setting someone else's password bypasses every credential check,
        // so it is reserved for superusers.
        if !principal.is_active {
            return Err(AccountError::Unauthorized);
        }
        if !principal.is_superuser {
            return Err(AccountError::Forbidden);
        }

        let account = self.require_target(principal, uuid).await?;

        let mut errors = ValidationErrors::new();
        if let Some(code) = password_code_error(new_password1) {
            errors.add_field("new_password1", code);
        }
        if new_password1 != new_password2 {
            errors.add_non_field(validation::PASSWORD_MISMATCH);
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let security = self.config.security.clone();
        let password = new_password1.trim().to_string();
        let password_hash = task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .map_err(|e| AccountError::Internal(format!("Hashing task panicked: {e}")))??;

        self.store
            .set_account_password_hash(account.id, password_hash)
            .await?;

        info!(uuid = %account.uuid, by = %principal.uuid, "Password set by admin");

        Ok(LifecycleCode::PasswordSet)
    }

    async fn disable_two_factor(
        &self,
        principal: &Principal,
        uuid: &str,
    ) -> Result<(), AccountError> {
        ensure_staff_with(principal, AdminPermission::ChangeUser)?;
        let account = self.require_target(principal, uuid).await?;

        let removed = self.store.remove_two_factor_devices(account.id).await?;
        info!(uuid = %account.uuid, removed, "Two-factor devices removed");

        Ok(())
    }

    async fn delete_user(&self, principal: &Principal, uuid: &str) -> Result<(), AccountError> {
        ensure_staff_with(principal, AdminPermission::DeleteUser)?;
        let account = self.require_target(principal, uuid).await?;

        self.store.delete_account(account.id).await?;
        info!(uuid = %account.uuid, by = %principal.uuid, "Account deleted");

        Ok(())
    }

    async fn list_users(
        &self,
        principal: &Principal,
    ) -> Result<Vec<AccountSummary>, AccountError> {
        ensure_staff_with(principal, AdminPermission::ChangeUser)?;

        let accounts = self.store.list_accounts().await?;
        Ok(accounts
            .into_iter()
            .filter(|account| principal.is_superuser || !account.is_superuser)
            .map(AccountSummary::from)
            .collect())
    }

    async fn get_user(
        &self,
        principal: &Principal,
        uuid: &str,
    ) -> Result<AccountSummary, AccountError> {
        ensure_staff_with(principal, AdminPermission::ChangeUser)?;
        let account = self.require_target(principal, uuid).await?;

        Ok(AccountSummary::from(account))
    }
}
