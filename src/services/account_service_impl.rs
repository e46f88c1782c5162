//! `SeaORM` implementation of the `AccountService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task;
use tracing::{debug, info};

use crate::config::Config;
use crate::db::{NewAccount, Store};
use crate::db::repositories::account::{hash_password, verify_password};
use crate::domain::{LifecycleCode, LifecycleEvent, RejectionCode, TokenPurpose};
use crate::notify::{Notice, NoticeKind, Notifier};
use crate::services::account_service::{
    AccountError, AccountService, AccountSummary, Credentials, SignInResult, SignUpRequest,
    SignUpResult, UpdateDetailsRequest,
};
use crate::token::TokenService;
use crate::validation::{
    self, ValidationErrors, email_error, first_name_error, full_name_error, last_name_error,
    password_code_error, password_error, split_full_name,
};

/// Callback invoked after a lifecycle transition has committed.
pub type LifecycleObserver = Arc<dyn Fn(&LifecycleEvent) + Send + Sync>;

pub struct SeaOrmAccountService {
    store: Store,
    config: Config,
    tokens: TokenService,
    notifier: Arc<dyn Notifier>,
    observers: Vec<LifecycleObserver>,
}

impl SeaOrmAccountService {
    #[must_use]
    pub fn new(store: Store, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        let tokens = TokenService::new(&config.security);
        Self {
            store,
            config,
            tokens,
            notifier,
            observers: Vec::new(),
        }
    }

    /// Register a callback to run after each committed transition. Observers
    /// run synchronously in registration order; they must not block.
    #[must_use]
    pub fn with_observer(mut self, observer: LifecycleObserver) -> Self {
        self.observers.push(observer);
        self
    }

    fn emit(&self, event: &LifecycleEvent) {
        for observer in &self.observers {
            observer(event);
        }
    }

    fn activation_url(&self, uuid: &str, token: &str) -> String {
        format!("{}/activate/{uuid}/{token}", self.config.notices.site_url)
    }

    fn reset_url(&self, uuid: &str, token: &str) -> String {
        format!(
            "{}/reset-password/{uuid}/{token}",
            self.config.notices.site_url
        )
    }

    async fn hash(&self, password: &str) -> Result<String, AccountError> {
        let security = self.config.security.clone();
        let password = password.trim().to_string();
        task::spawn_blocking(move || hash_password(&password, &security))
            .await
            .map_err(|e| AccountError::Internal(format!("Hashing task panicked: {e}")))?
            .map_err(AccountError::from)
    }

    async fn send_notice(&self, notice: Notice) -> Result<(), AccountError> {
        self.notifier
            .send(notice)
            .await
            .map_err(|e| AccountError::Notification(e.to_string()))
    }
}

#[async_trait]
impl AccountService for SeaOrmAccountService {
    async fn sign_up(&self, request: SignUpRequest) -> Result<SignUpResult, AccountError> {
        if !self.config.features.sign_up_enabled {
            return Err(AccountError::Rejected(RejectionCode::SignUpDisabled));
        }

        let mut errors = ValidationErrors::new();
        if let Some(message) = full_name_error(&request.full_name) {
            errors.add_field("full_name", message);
        }
        if let Some(message) = email_error(&request.email) {
            errors.add_field("email", message);
        } else if self.store.email_taken(&request.email, None).await? {
            errors.add_field("email", validation::EMAIL_TAKEN);
        }
        if let Some(message) = password_error(&request.password) {
            errors.add_field("password", message);
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let password_hash = self.hash(&request.password).await?;
        let (first_name, last_name) = split_full_name(&request.full_name);
        let force_activation = self.config.features.force_activation;

        let (account, token_key) = self
            .store
            .create_account(NewAccount {
                email: request.email,
                password_hash,
                first_name,
                last_name,
                is_active: !force_activation,
                is_staff: false,
                is_superuser: false,
            })
            .await?;

        info!(uuid = %account.uuid, active = account.is_active, "Account signed up");

        if force_activation {
            let token = self.tokens.issue(&account, TokenPurpose::Activation);
            self.send_notice(Notice {
                kind: NoticeKind::Activation,
                recipient: account.email.clone(),
                first_name: account.first_name.clone(),
                url: self.activation_url(&account.uuid, &token),
            })
            .await?;
        }

        self.emit(&LifecycleEvent::SignedUp {
            uuid: account.uuid.clone(),
        });

        Ok(SignUpResult {
            token: token_key,
            account: AccountSummary::from(account),
        })
    }

    async fn activate(&self, uuid: &str, token: &str) -> Result<LifecycleCode, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        if !self.tokens.verify(&account, TokenPurpose::Activation, token) {
            return Err(AccountError::Rejected(RejectionCode::TokenInvalid));
        }

        // Racing a second activation with the same token is harmless, the
        // flag is simply set again.
        if !account.is_active {
            self.store.set_account_active(account.id, true).await?;
            info!(uuid = %account.uuid, "Account activated");
        }

        self.emit(&LifecycleEvent::Activated {
            uuid: account.uuid.clone(),
        });

        Ok(LifecycleCode::Activated)
    }

    async fn resend_activation_link(&self, uuid: &str) -> Result<LifecycleCode, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        if account.is_active {
            return Err(AccountError::Rejected(RejectionCode::UserActive));
        }

        let token = self.tokens.issue(&account, TokenPurpose::Activation);
        self.send_notice(Notice {
            kind: NoticeKind::Activation,
            recipient: account.email.clone(),
            first_name: account.first_name.clone(),
            url: self.activation_url(&account.uuid, &token),
        })
        .await?;

        Ok(LifecycleCode::ActivationSent)
    }

    async fn sign_in(&self, credentials: Credentials) -> Result<SignInResult, AccountError> {
        if !self.config.features.sign_in_enabled {
            return Err(AccountError::Rejected(RejectionCode::SignInDisabled));
        }

        let account = self.store.get_account_by_email(&credentials.email).await?;

        // One failure message for both unknown email and wrong password, so
        // sign-in cannot be used to probe registered addresses.
        let verified = match &account {
            Some(account) => {
                verify_password(&account.password_hash, &credentials.password).await?
            }
            None => false,
        };
        let Some(account) = account.filter(|_| verified) else {
            return Err(AccountError::non_field(
                "The email and password combination is invalid.",
            ));
        };

        if !account.is_active {
            return Err(AccountError::non_field("Your account is not active."));
        }

        self.store.touch_last_login(account.id).await?;
        let token = self.store.get_or_create_auth_token(account.id).await?;

        let account = self
            .store
            .get_account_by_id(account.id)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        debug!(uuid = %account.uuid, "Account signed in");

        self.emit(&LifecycleEvent::SignedIn {
            uuid: account.uuid.clone(),
        });

        Ok(SignInResult {
            token,
            account: AccountSummary::from(account),
        })
    }

    async fn authenticate(&self, token_key: &str) -> Result<AccountSummary, AccountError> {
        let account = self
            .store
            .get_account_by_token_key(token_key)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::TokenInvalid))?;

        if !account.is_active {
            return Err(AccountError::Rejected(RejectionCode::UserInactive));
        }

        Ok(AccountSummary::from(account))
    }

    async fn request_password_reset(&self, email: &str) -> Result<LifecycleCode, AccountError> {
        // Always report success. Unknown and inactive accounts are silently
        // skipped so the endpoint cannot confirm whether an email exists.
        if let Some(account) = self.store.get_account_by_email(email).await? {
            if account.is_active {
                let token = self.tokens.issue(&account, TokenPurpose::PasswordReset);
                self.send_notice(Notice {
                    kind: NoticeKind::PasswordReset,
                    recipient: account.email.clone(),
                    first_name: account.first_name.clone(),
                    url: self.reset_url(&account.uuid, &token),
                })
                .await?;

                self.emit(&LifecycleEvent::PasswordResetRequested {
                    uuid: account.uuid.clone(),
                });
            } else {
                debug!(uuid = %account.uuid, "Reset requested for inactive account, skipped");
            }
        }

        Ok(LifecycleCode::PasswordReset)
    }

    async fn validate_reset_token(
        &self,
        uuid: &str,
        token: &str,
    ) -> Result<LifecycleCode, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        if !self.tokens.verify(&account, TokenPurpose::PasswordReset, token) {
            return Err(AccountError::Rejected(RejectionCode::TokenInvalid));
        }

        Ok(LifecycleCode::TokenValid)
    }

    async fn set_new_password(
        &self,
        uuid: &str,
        token: &str,
        password1: &str,
        password2: &str,
    ) -> Result<LifecycleCode, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        if !self.tokens.verify(&account, TokenPurpose::PasswordReset, token) {
            return Err(AccountError::Rejected(RejectionCode::TokenInvalid));
        }

        let mut errors = ValidationErrors::new();
        if let Some(code) = password_code_error(password1) {
            errors.add_field("password1", code);
        }
        if password1 != password2 {
            errors.add_non_field(validation::PASSWORD_MISMATCH);
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let password_hash = self.hash(password1).await?;
        self.store
            .set_account_password_hash(account.id, password_hash)
            .await?;

        info!(uuid = %account.uuid, "Password set via reset token");

        self.emit(&LifecycleEvent::PasswordSet {
            uuid: account.uuid.clone(),
        });

        Ok(LifecycleCode::PasswordSet)
    }

    async fn change_password(
        &self,
        uuid: &str,
        current_password: &str,
        new_password1: &str,
        new_password2: &str,
    ) -> Result<LifecycleCode, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        if !verify_password(&account.password_hash, current_password).await? {
            return Err(AccountError::field(
                "current_password",
                "Your current password was entered incorrectly.",
            ));
        }

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

        let password_hash = self.hash(new_password1).await?;
        self.store
            .set_account_password_hash(account.id, password_hash)
            .await?;

        info!(uuid = %account.uuid, "Password changed");

        self.emit(&LifecycleEvent::PasswordChanged {
            uuid: account.uuid.clone(),
        });

        Ok(LifecycleCode::PasswordSet)
    }

    async fn update_details(
        &self,
        uuid: &str,
        request: UpdateDetailsRequest,
    ) -> Result<AccountSummary, AccountError> {
        let account = self
            .store
            .get_account_by_uuid(uuid)
            .await?
            .ok_or(AccountError::Rejected(RejectionCode::UserInvalid))?;

        let mut errors = ValidationErrors::new();
        if let Some(message) = first_name_error(&request.first_name) {
            errors.add_field("first_name", message);
        }
        if let Some(message) = last_name_error(&request.last_name) {
            errors.add_field("last_name", message);
        }
        if let Some(message) = email_error(&request.email) {
            errors.add_field("email", message);
        } else if self.store.email_taken(&request.email, Some(account.id)).await? {
            errors.add_field("email", validation::EMAIL_TAKEN);
        }
        if !errors.is_empty() {
            return Err(AccountError::Validation(errors));
        }

        let updated = self
            .store
            .update_account_details(
                account.id,
                request.first_name.trim().to_string(),
                request.last_name.trim().to_string(),
                request.email,
            )
            .await?;

        self.emit(&LifecycleEvent::DetailsUpdated {
            uuid: updated.uuid.clone(),
        });

        Ok(AccountSummary::from(updated))
    }
}
