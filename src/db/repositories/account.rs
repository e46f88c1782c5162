use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use std::collections::HashSet;
use tokio::task;

use crate::config::SecurityConfig;
use crate::db::repositories::auth_token::generate_token_key;
use crate::validation::normalize_email;
use crate::entities::{
    account_permissions, account_roles, accounts, auth_tokens, permissions, profiles,
    role_permissions, two_factor_devices,
};

/// Account row as the services see it. Includes the password hash and
/// last-login because token derivation fingerprints both; response summaries
/// are built at the service layer and never expose them.
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i32,
    pub uuid: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub date_joined: String,
    pub last_login: String,
}

impl Account {
    /// An empty hash means the account was invited but never set a password.
    #[must_use]
    pub fn has_password(&self) -> bool {
        !self.password_hash.is_empty()
    }
}

impl From<accounts::Model> for Account {
    fn from(model: accounts::Model) -> Self {
        Self {
            id: model.id,
            uuid: model.uuid,
            email: model.email,
            password_hash: model.password_hash,
            first_name: model.first_name,
            last_name: model.last_name,
            is_active: model.is_active,
            is_staff: model.is_staff,
            is_superuser: model.is_superuser,
            date_joined: model.date_joined,
            last_login: model.last_login,
        }
    }
}

/// Input for account creation.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// Partial update applied by the admin panel. `None` fields are untouched;
/// the authorization guard strips privilege fields before this reaches the
/// repository.
#[derive(Debug, Clone, Default)]
pub struct AccountChangeset {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub is_superuser: Option<bool>,
    pub role_ids: Option<Vec<i32>>,
    pub permission_ids: Option<Vec<i32>>,
}

pub struct AccountRepository {
    conn: DatabaseConnection,
}

impl AccountRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_uuid(&self, uuid: &str) -> Result<Option<Account>> {
        let account = accounts::Entity::find()
            .filter(accounts::Column::Uuid.eq(uuid))
            .one(&self.conn)
            .await
            .context("Failed to query account by uuid")?;

        Ok(account.map(Account::from))
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<Account>> {
        let account = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account by id")?;

        Ok(account.map(Account::from))
    }

    /// Lookup by email. The argument is normalized (trim + lowercase) before
    /// the query, and rows are stored normalized, so the comparison is
    /// case-insensitive end to end.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let normalized = normalize_email(email);

        let account = accounts::Entity::find()
            .filter(accounts::Column::Email.eq(normalized))
            .one(&self.conn)
            .await
            .context("Failed to query account by email")?;

        Ok(account.map(Account::from))
    }

    /// Case-insensitive uniqueness check, optionally excluding one account
    /// (self-service detail updates must not conflict with the caller's own
    /// row).
    pub async fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> Result<bool> {
        let normalized = normalize_email(email);

        let mut query =
            accounts::Entity::find().filter(accounts::Column::Email.eq(normalized));
        if let Some(id) = exclude_id {
            query = query.filter(accounts::Column::Id.ne(id));
        }

        let existing = query
            .one(&self.conn)
            .await
            .context("Failed to check email uniqueness")?;

        Ok(existing.is_some())
    }

    pub async fn list(&self) -> Result<Vec<Account>> {
        let rows = accounts::Entity::find()
            .all(&self.conn)
            .await
            .context("Failed to list accounts")?;

        Ok(rows.into_iter().map(Account::from).collect())
    }

    /// Create the account and its bearer token in one transaction so no
    /// reader can observe the row without its credential. Returns the account
    /// and the token key.
    pub async fn create(&self, new: NewAccount) -> Result<(Account, String)> {
        let now = chrono::Utc::now().to_rfc3339();
        let uuid = uuid::Uuid::new_v4().to_string();

        let txn = self.conn.begin().await?;

        let account = accounts::ActiveModel {
            uuid: Set(uuid),
            email: Set(normalize_email(&new.email)),
            password_hash: Set(new.password_hash),
            first_name: Set(new.first_name),
            last_name: Set(new.last_name),
            is_active: Set(new.is_active),
            is_staff: Set(new.is_staff),
            is_superuser: Set(new.is_superuser),
            date_joined: Set(now.clone()),
            last_login: Set(now.clone()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert account")?;

        let key = generate_token_key();
        auth_tokens::ActiveModel {
            account_id: Set(account.id),
            key: Set(key.clone()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert auth token")?;

        txn.commit().await?;

        Ok((Account::from(account), key))
    }

    pub async fn set_active(&self, id: i32, active: bool) -> Result<()> {
        let account = self.require(id).await?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.is_active = Set(active);
        active_model.update(&self.conn).await?;

        Ok(())
    }

    /// Replace the stored hash. Rotates the token fingerprint, so every
    /// previously issued activation/reset token stops validating.
    pub async fn set_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        let account = self.require(id).await?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.password_hash = Set(password_hash);
        active_model.update(&self.conn).await?;

        Ok(())
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        let account = self.require(id).await?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.last_login = Set(chrono::Utc::now().to_rfc3339());
        active_model.update(&self.conn).await?;

        Ok(())
    }

    pub async fn update_details(
        &self,
        id: i32,
        first_name: String,
        last_name: String,
        email: String,
    ) -> Result<Account> {
        let account = self.require(id).await?;

        let mut active_model: accounts::ActiveModel = account.into();
        active_model.first_name = Set(first_name);
        active_model.last_name = Set(last_name);
        active_model.email = Set(normalize_email(&email));
        let updated = active_model.update(&self.conn).await?;

        Ok(Account::from(updated))
    }

    /// Apply an admin changeset (fields plus role/permission membership) in
    /// one transaction.
    pub async fn apply_changeset(&self, id: i32, changeset: &AccountChangeset) -> Result<Account> {
        let txn = self.conn.begin().await?;

        // Read inside the transaction so a concurrent writer cannot slip in
        // between the read and the commit.
        let account = accounts::Entity::find_by_id(id)
            .one(&txn)
            .await
            .context("Failed to query account")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))?;

        let has_field_changes = changeset.first_name.is_some()
            || changeset.last_name.is_some()
            || changeset.email.is_some()
            || changeset.is_active.is_some()
            || changeset.is_staff.is_some()
            || changeset.is_superuser.is_some();

        // An all-Unchanged update is an error in SeaORM, so skip the row
        // update when only membership changes.
        let updated = if has_field_changes {
            let mut active_model: accounts::ActiveModel = account.into();
            if let Some(first_name) = &changeset.first_name {
                active_model.first_name = Set(first_name.clone());
            }
            if let Some(last_name) = &changeset.last_name {
                active_model.last_name = Set(last_name.clone());
            }
            if let Some(email) = &changeset.email {
                active_model.email = Set(normalize_email(email));
            }
            if let Some(is_active) = changeset.is_active {
                active_model.is_active = Set(is_active);
            }
            if let Some(is_staff) = changeset.is_staff {
                active_model.is_staff = Set(is_staff);
            }
            if let Some(is_superuser) = changeset.is_superuser {
                active_model.is_superuser = Set(is_superuser);
            }
            active_model.update(&txn).await?
        } else {
            account
        };

        if let Some(role_ids) = &changeset.role_ids {
            account_roles::Entity::delete_many()
                .filter(account_roles::Column::AccountId.eq(id))
                .exec(&txn)
                .await?;
            for role_id in role_ids {
                account_roles::ActiveModel {
                    account_id: Set(id),
                    role_id: Set(*role_id),
                }
                .insert(&txn)
                .await?;
            }
        }

        if let Some(permission_ids) = &changeset.permission_ids {
            account_permissions::Entity::delete_many()
                .filter(account_permissions::Column::AccountId.eq(id))
                .exec(&txn)
                .await?;
            for permission_id in permission_ids {
                account_permissions::ActiveModel {
                    account_id: Set(id),
                    permission_id: Set(*permission_id),
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;

        Ok(Account::from(updated))
    }

    /// Delete the account and everything it owns: bearer token, two-factor
    /// devices, profile extension, role/permission membership.
    pub async fn delete(&self, id: i32) -> Result<bool> {
        let Some(account) = accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account for deletion")?
        else {
            return Ok(false);
        };

        let txn = self.conn.begin().await?;

        auth_tokens::Entity::delete_many()
            .filter(auth_tokens::Column::AccountId.eq(id))
            .exec(&txn)
            .await?;
        two_factor_devices::Entity::delete_many()
            .filter(two_factor_devices::Column::AccountId.eq(id))
            .exec(&txn)
            .await?;
        profiles::Entity::delete_many()
            .filter(profiles::Column::AccountId.eq(id))
            .exec(&txn)
            .await?;
        account_roles::Entity::delete_many()
            .filter(account_roles::Column::AccountId.eq(id))
            .exec(&txn)
            .await?;
        account_permissions::Entity::delete_many()
            .filter(account_permissions::Column::AccountId.eq(id))
            .exec(&txn)
            .await?;

        accounts::Entity::delete_by_id(account.id).exec(&txn).await?;

        txn.commit().await?;

        Ok(true)
    }

    /// Permission codenames an account holds, directly assigned plus
    /// role-derived.
    pub async fn permission_codenames(&self, id: i32) -> Result<HashSet<String>> {
        let mut permission_ids: HashSet<i32> = account_permissions::Entity::find()
            .filter(account_permissions::Column::AccountId.eq(id))
            .all(&self.conn)
            .await
            .context("Failed to query direct permissions")?
            .into_iter()
            .map(|row| row.permission_id)
            .collect();

        let role_ids: Vec<i32> = account_roles::Entity::find()
            .filter(account_roles::Column::AccountId.eq(id))
            .all(&self.conn)
            .await
            .context("Failed to query account roles")?
            .into_iter()
            .map(|row| row.role_id)
            .collect();

        if !role_ids.is_empty() {
            let derived = role_permissions::Entity::find()
                .filter(role_permissions::Column::RoleId.is_in(role_ids))
                .all(&self.conn)
                .await
                .context("Failed to query role permissions")?;
            permission_ids.extend(derived.into_iter().map(|row| row.permission_id));
        }

        if permission_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let rows = permissions::Entity::find()
            .filter(permissions::Column::Id.is_in(permission_ids))
            .all(&self.conn)
            .await
            .context("Failed to resolve permission codenames")?;

        Ok(rows.into_iter().map(|row| row.codename).collect())
    }

    pub async fn role_ids(&self, id: i32) -> Result<Vec<i32>> {
        let rows = account_roles::Entity::find()
            .filter(account_roles::Column::AccountId.eq(id))
            .all(&self.conn)
            .await
            .context("Failed to query account roles")?;

        Ok(rows.into_iter().map(|row| row.role_id).collect())
    }

    pub async fn remove_two_factor_devices(&self, id: i32) -> Result<u64> {
        let result = two_factor_devices::Entity::delete_many()
            .filter(two_factor_devices::Column::AccountId.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to delete two-factor devices")?;

        Ok(result.rows_affected)
    }

    pub async fn add_two_factor_device(&self, id: i32, name: &str, confirmed: bool) -> Result<()> {
        two_factor_devices::ActiveModel {
            account_id: Set(id),
            name: Set(name.to_string()),
            confirmed: Set(confirmed),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert two-factor device")?;

        Ok(())
    }

    /// Upsert the host-supplied profile extension record.
    pub async fn set_profile_data(&self, id: i32, data: serde_json::Value) -> Result<()> {
        let existing = profiles::Entity::find()
            .filter(profiles::Column::AccountId.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query profile")?;

        match existing {
            Some(profile) => {
                let mut active_model: profiles::ActiveModel = profile.into();
                active_model.data = Set(data);
                active_model
                    .update(&self.conn)
                    .await
                    .context("Failed to update profile")?;
            }
            None => {
                profiles::ActiveModel {
                    account_id: Set(id),
                    data: Set(data),
                    ..Default::default()
                }
                .insert(&self.conn)
                .await
                .context("Failed to insert profile")?;
            }
        }

        Ok(())
    }

    pub async fn profile_data(&self, id: i32) -> Result<Option<serde_json::Value>> {
        let profile = profiles::Entity::find()
            .filter(profiles::Column::AccountId.eq(id))
            .one(&self.conn)
            .await
            .context("Failed to query profile")?;

        Ok(profile.map(|p| p.data))
    }

    async fn require(&self, id: i32) -> Result<accounts::Model> {
        accounts::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query account")?
            .ok_or_else(|| anyhow::anyhow!("Account not found: {id}"))
    }
}

/// Hash a password using Argon2id with the configured params.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Verify a password against a stored hash.
/// Note: runs in `spawn_blocking` because Argon2 verification is
/// CPU-intensive and would stall the async runtime if run inline.
pub async fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    if password_hash.is_empty() {
        // No password set yet; nothing can match.
        return Ok(false);
    }

    let password_hash = password_hash.to_string();
    let password = password.to_string();

    let is_valid = task::spawn_blocking(move || {
        let parsed_hash = PasswordHash::new(&password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

        let argon2 = Argon2::default();
        Ok::<bool, anyhow::Error>(
            argon2
                .verify_password(password.as_bytes(), &parsed_hash)
                .is_ok(),
        )
    })
    .await
    .context("Password verification task panicked")??;

    Ok(is_valid)
}
