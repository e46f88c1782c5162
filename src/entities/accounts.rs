use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Public opaque identifier. Assigned at creation, never changed or reused.
    #[sea_orm(unique)]
    pub uuid: String,

    /// Stored trimmed and lower-cased; uniqueness is case-insensitive by
    /// construction.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id hash. Empty string means no password has been set yet
    /// (invited, not onboarded).
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub is_active: bool,

    pub is_staff: bool,

    pub is_superuser: bool,

    pub date_joined: String,

    /// RFC3339. Part of the token fingerprint: signing in rotates it, which
    /// invalidates outstanding activation/reset links.
    pub last_login: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::auth_tokens::Entity")]
    AuthTokens,
    #[sea_orm(has_many = "super::two_factor_devices::Entity")]
    TwoFactorDevices,
}

impl ActiveModelBehavior for ActiveModel {}
