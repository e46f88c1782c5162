use anyhow::{Context, Result};
use rand::Rng;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::db::repositories::account::Account;
use crate::entities::{accounts, auth_tokens};

pub struct AuthTokenRepository {
    conn: DatabaseConnection,
}

impl AuthTokenRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Return the account's bearer token key, creating one if the row was
    /// provisioned without it.
    pub async fn get_or_create(&self, account_id: i32) -> Result<String> {
        let existing = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::AccountId.eq(account_id))
            .one(&self.conn)
            .await
            .context("Failed to query auth token")?;

        if let Some(token) = existing {
            return Ok(token.key);
        }

        let key = generate_token_key();
        auth_tokens::ActiveModel {
            account_id: Set(account_id),
            key: Set(key.clone()),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            ..Default::default()
        }
        .insert(&self.conn)
        .await
        .context("Failed to insert auth token")?;

        Ok(key)
    }

    /// Resolve a presented bearer key to its account, if any.
    pub async fn find_account_by_key(&self, key: &str) -> Result<Option<Account>> {
        let Some(token) = auth_tokens::Entity::find()
            .filter(auth_tokens::Column::Key.eq(key))
            .one(&self.conn)
            .await
            .context("Failed to query auth token by key")?
        else {
            return Ok(None);
        };

        let account = accounts::Entity::find_by_id(token.account_id)
            .one(&self.conn)
            .await
            .context("Failed to query token owner")?;

        Ok(account.map(Account::from))
    }

}

/// Generate a random 64-character hex token key.
#[must_use]
pub fn generate_token_key() -> String {
    let mut rng = rand::rng();
    (0..64)
        .map(|_| format!("{:x}", rng.random_range(0..16)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_key_format() {
        let key = generate_token_key();
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_token_key_unique() {
        assert_ne!(generate_token_key(), generate_token_key());
    }
}
