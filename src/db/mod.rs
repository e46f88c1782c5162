use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{Account, AccountChangeset, NewAccount};
pub use repositories::role::Role;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // An in-memory database exists per connection, so the pool must
        // never grow past one.
        let (max_connections, min_connections) = if db_url.contains(":memory:") {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    fn auth_token_repo(&self) -> repositories::auth_token::AuthTokenRepository {
        repositories::auth_token::AuthTokenRepository::new(self.conn.clone())
    }

    fn role_repo(&self) -> repositories::role::RoleRepository {
        repositories::role::RoleRepository::new(self.conn.clone())
    }

    pub async fn get_account_by_uuid(&self, uuid: &str) -> Result<Option<Account>> {
        self.account_repo().find_by_uuid(uuid).await
    }

    pub async fn get_account_by_id(&self, id: i32) -> Result<Option<Account>> {
        self.account_repo().find_by_id(id).await
    }

    pub async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.account_repo().find_by_email(email).await
    }

    pub async fn email_taken(&self, email: &str, exclude_id: Option<i32>) -> Result<bool> {
        self.account_repo().email_taken(email, exclude_id).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.account_repo().list().await
    }

    pub async fn create_account(&self, new: NewAccount) -> Result<(Account, String)> {
        self.account_repo().create(new).await
    }

    pub async fn set_account_active(&self, id: i32, active: bool) -> Result<()> {
        self.account_repo().set_active(id, active).await
    }

    pub async fn set_account_password_hash(&self, id: i32, password_hash: String) -> Result<()> {
        self.account_repo().set_password_hash(id, password_hash).await
    }

    pub async fn touch_last_login(&self, id: i32) -> Result<()> {
        self.account_repo().touch_last_login(id).await
    }

    pub async fn update_account_details(
        &self,
        id: i32,
        first_name: String,
        last_name: String,
        email: String,
    ) -> Result<Account> {
        self.account_repo()
            .update_details(id, first_name, last_name, email)
            .await
    }

    pub async fn apply_account_changeset(
        &self,
        id: i32,
        changeset: &AccountChangeset,
    ) -> Result<Account> {
        self.account_repo().apply_changeset(id, changeset).await
    }

    pub async fn delete_account(&self, id: i32) -> Result<bool> {
        self.account_repo().delete(id).await
    }

    pub async fn account_permission_codenames(&self, id: i32) -> Result<HashSet<String>> {
        self.account_repo().permission_codenames(id).await
    }

    pub async fn account_role_ids(&self, id: i32) -> Result<Vec<i32>> {
        self.account_repo().role_ids(id).await
    }

    pub async fn remove_two_factor_devices(&self, id: i32) -> Result<u64> {
        self.account_repo().remove_two_factor_devices(id).await
    }

    pub async fn add_two_factor_device(&self, id: i32, name: &str, confirmed: bool) -> Result<()> {
        self.account_repo()
            .add_two_factor_device(id, name, confirmed)
            .await
    }

    pub async fn set_profile_data(&self, id: i32, data: serde_json::Value) -> Result<()> {
        self.account_repo().set_profile_data(id, data).await
    }

    pub async fn get_profile_data(&self, id: i32) -> Result<Option<serde_json::Value>> {
        self.account_repo().profile_data(id).await
    }

    pub async fn get_or_create_auth_token(&self, account_id: i32) -> Result<String> {
        self.auth_token_repo().get_or_create(account_id).await
    }

    pub async fn get_account_by_token_key(&self, key: &str) -> Result<Option<Account>> {
        self.auth_token_repo().find_account_by_key(key).await
    }

    pub async fn create_role(&self, name: &str) -> Result<Role> {
        self.role_repo().create(name).await
    }

    pub async fn get_permission_id(&self, codename: &str) -> Result<Option<i32>> {
        self.role_repo().permission_id(codename).await
    }

    pub async fn grant_role_permission(&self, role_id: i32, permission_id: i32) -> Result<()> {
        self.role_repo().grant_permission(role_id, permission_id).await
    }
}
