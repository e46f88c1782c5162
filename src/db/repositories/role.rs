use anyhow::{Context, Result};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::{permissions, role_permissions, roles};

#[derive(Debug, Clone)]
pub struct Role {
    pub id: i32,
    pub name: String,
}

impl From<roles::Model> for Role {
    fn from(model: roles::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

pub struct RoleRepository {
    conn: DatabaseConnection,
}

impl RoleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, name: &str) -> Result<Role> {
        let role = roles::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert role")?;

        Ok(Role::from(role))
    }

    /// Look up a permission id by codename, e.g. `change_user`.
    pub async fn permission_id(&self, codename: &str) -> Result<Option<i32>> {
        let permission = permissions::Entity::find()
            .filter(permissions::Column::Codename.eq(codename))
            .one(&self.conn)
            .await
            .context("Failed to query permission by codename")?;

        Ok(permission.map(|p| p.id))
    }

    pub async fn grant_permission(&self, role_id: i32, permission_id: i32) -> Result<()> {
        role_permissions::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
        }
        .insert(&self.conn)
        .await
        .context("Failed to grant permission to role")?;

        Ok(())
    }
}
