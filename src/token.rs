use sha2::{Digest, Sha256};

use crate::config::SecurityConfig;
use crate::db::Account;
use crate::domain::TokenPurpose;

/// Derives and checks single-purpose account tokens (activation links,
/// password-reset links) without storing anything.
///
/// A token is a hash over the account's identity, a fingerprint of its
/// credential state and a coarse time bucket. Setting a password or signing
/// in changes the fingerprint, so every previously issued token stops
/// validating on its own. No revocation table is needed.
#[derive(Clone)]
pub struct TokenService {
    secret: String,
    bucket_seconds: u64,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &SecurityConfig) -> Self {
        Self {
            secret: config.token_secret.clone(),
            bucket_seconds: config.token_bucket_seconds.max(1),
        }
    }

    /// Issue a token for the account in the current time bucket.
    #[must_use]
    pub fn issue(&self, account: &Account, purpose: TokenPurpose) -> String {
        self.derive(account, purpose, self.current_bucket())
    }

    /// Check a presented token. Tokens from the current and the previous
    /// bucket are accepted, so a token is valid for at least one full bucket
    /// and at most two.
    #[must_use]
    pub fn verify(&self, account: &Account, purpose: TokenPurpose, token: &str) -> bool {
        let current = self.current_bucket();
        if constant_time_eq(token, &self.derive(account, purpose, current)) {
            return true;
        }
        current > 0 && constant_time_eq(token, &self.derive(account, purpose, current - 1))
    }

    fn current_bucket(&self) -> u64 {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        now / self.bucket_seconds
    }

    fn derive(&self, account: &Account, purpose: TokenPurpose, bucket: u64) -> String {
        // The fingerprint binds the token to the credential state at issue
        // time. last_login is included so a plain sign-in also rotates it.
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(account.uuid.as_bytes());
        hasher.update(account.password_hash.as_bytes());
        hasher.update(account.last_login.as_bytes());
        hasher.update(purpose.as_str().as_bytes());
        hasher.update(bucket.to_be_bytes());
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(64);
        for byte in digest {
            hex.push_str(&format!("{byte:02x}"));
        }

        format!("{bucket:x}-{}", &hex[..40])
    }
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new(&SecurityConfig {
            token_secret: "unit-test-secret".to_string(),
            ..Default::default()
        })
    }

    fn account() -> Account {
        Account {
            id: 1,
            uuid: "0d9f93e1-ec28-40a8-ae92-fb0a4fe5b989".to_string(),
            email: "test@test.com".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            first_name: "Ethan".to_string(),
            last_name: "Sky Blue".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            date_joined: "2026-01-01T00:00:00+00:00".to_string(),
            last_login: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_issue_is_stable_within_bucket() {
        let svc = service();
        let acct = account();
        assert_eq!(
            svc.issue(&acct, TokenPurpose::Activation),
            svc.issue(&acct, TokenPurpose::Activation)
        );
    }

    #[test]
    fn test_verify_accepts_fresh_token() {
        let svc = service();
        let acct = account();
        let token = svc.issue(&acct, TokenPurpose::Activation);
        assert!(svc.verify(&acct, TokenPurpose::Activation, &token));
    }

    #[test]
    fn test_purpose_is_scoped() {
        let svc = service();
        let acct = account();
        let token = svc.issue(&acct, TokenPurpose::Activation);
        assert!(!svc.verify(&acct, TokenPurpose::PasswordReset, &token));
    }

    #[test]
    fn test_password_change_invalidates_token() {
        let svc = service();
        let acct = account();
        let token = svc.issue(&acct, TokenPurpose::PasswordReset);

        let mut rotated = account();
        rotated.password_hash = "$argon2id$other".to_string();
        assert!(!svc.verify(&rotated, TokenPurpose::PasswordReset, &token));
    }

    #[test]
    fn test_sign_in_invalidates_token() {
        let svc = service();
        let acct = account();
        let token = svc.issue(&acct, TokenPurpose::PasswordReset);

        let mut rotated = account();
        rotated.last_login = "2026-02-01T00:00:00+00:00".to_string();
        assert!(!svc.verify(&rotated, TokenPurpose::PasswordReset, &token));
    }

    #[test]
    fn test_garbage_is_rejected() {
        let svc = service();
        let acct = account();
        assert!(!svc.verify(&acct, TokenPurpose::Activation, "not-a-token"));
        assert!(!svc.verify(&acct, TokenPurpose::Activation, ""));
    }

    #[test]
    fn test_tokens_differ_between_accounts() {
        let svc = service();
        let first = account();
        let mut second = account();
        second.uuid = "c2a72b31-7c3e-4b2a-9a3e-2f1f4c1b0d11".to_string();
        assert_ne!(
            svc.issue(&first, TokenPurpose::Activation),
            svc.issue(&second, TokenPurpose::Activation)
        );
    }
}
