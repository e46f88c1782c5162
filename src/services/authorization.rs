//! Authorization guard for the admin operations.
//!
//! Admin calls carry a `Principal` describing the caller. Checks are
//! deny-by-default: staff status plus the named permission are required, and
//! privilege escalation fields are stripped from changesets submitted by
//! non-superusers.

use std::collections::HashSet;

use crate::db::{Account, AccountChangeset};
use crate::services::account_service::AccountError;

/// The authenticated caller of an admin operation, with its resolved
/// permission codenames (direct plus role-derived).
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: i32,
    pub uuid: String,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub permissions: HashSet<String>,
}

impl Principal {
    #[must_use]
    pub fn from_account(account: &Account, permissions: HashSet<String>) -> Self {
        Self {
            id: account.id,
            uuid: account.uuid.clone(),
            is_active: account.is_active,
            is_staff: account.is_staff,
            is_superuser: account.is_superuser,
            permissions,
        }
    }

    /// Superusers hold every permission implicitly.
    #[must_use]
    pub fn has_permission(&self, codename: &str) -> bool {
        self.is_superuser || self.permissions.contains(codename)
    }
}

/// Permissions checked by the admin operations. Codenames match the rows
/// seeded by the initial migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPermission {
    AddUser,
    ChangeUser,
    DeleteUser,
}

impl AdminPermission {
    #[must_use]
    pub const fn codename(self) -> &'static str {
        match self {
            Self::AddUser => "add_user",
            Self::ChangeUser => "change_user",
            Self::DeleteUser => "delete_user",
        }
    }
}

/// Require an active staff caller holding the given permission.
pub fn ensure_staff_with(
    principal: &Principal,
    permission: AdminPermission,
) -> Result<(), AccountError> {
    if !principal.is_active {
        return Err(AccountError::Unauthorized);
    }
    if !principal.is_staff || !principal.has_permission(permission.codename()) {
        return Err(AccountError::Forbidden);
    }
    Ok(())
}

/// Non-superusers may not view or modify superuser accounts.
pub fn ensure_can_target(principal: &Principal, target: &Account) -> Result<(), AccountError> {
    if target.is_superuser && !principal.is_superuser {
        return Err(AccountError::Forbidden);
    }
    Ok(())
}

/// Strip privilege fields from a changeset submitted by a non-superuser.
/// The fields are dropped silently, matching form behavior where the inputs
/// are simply absent for such callers.
#[must_use]
pub fn sanitize_changeset(principal: &Principal, mut changeset: AccountChangeset) -> AccountChangeset {
    if !principal.is_superuser {
        changeset.is_staff = None;
        changeset.is_superuser = None;
        changeset.role_ids = None;
        changeset.permission_ids = None;
    }
    changeset
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(is_staff: bool, is_superuser: bool, permissions: &[&str]) -> Principal {
        Principal {
            id: 1,
            uuid: "caller-uuid".to_string(),
            is_active: true,
            is_staff,
            is_superuser,
            permissions: permissions.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    fn target(is_superuser: bool) -> Account {
        Account {
            id: 2,
            uuid: "target-uuid".to_string(),
            email: "target@test.com".to_string(),
            password_hash: String::new(),
            first_name: "Target".to_string(),
            last_name: "Account".to_string(),
            is_active: true,
            is_staff: false,
            is_superuser,
            date_joined: "2026-01-01T00:00:00+00:00".to_string(),
            last_login: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_staff_with_permission_passes() {
        let caller = principal(true, false, &["change_user"]);
        assert!(ensure_staff_with(&caller, AdminPermission::ChangeUser).is_ok());
    }

    #[test]
    fn test_missing_permission_is_forbidden() {
        let caller = principal(true, false, &["add_user"]);
        assert!(matches!(
            ensure_staff_with(&caller, AdminPermission::DeleteUser),
            Err(AccountError::Forbidden)
        ));
    }

    #[test]
    fn test_non_staff_is_forbidden_even_with_permission() {
        let caller = principal(false, false, &["change_user"]);
        assert!(matches!(
            ensure_staff_with(&caller, AdminPermission::ChangeUser),
            Err(AccountError::Forbidden)
        ));
    }

    #[test]
    fn test_inactive_caller_is_unauthorized() {
        let mut caller = principal(true, true, &[]);
        caller.is_active = false;
        assert!(matches!(
            ensure_staff_with(&caller, AdminPermission::AddUser),
            Err(AccountError::Unauthorized)
        ));
    }

    #[test]
    fn test_superuser_implies_all_permissions() {
        let caller = principal(true, true, &[]);
        assert!(ensure_staff_with(&caller, AdminPermission::DeleteUser).is_ok());
    }

    #[test]
    fn test_superuser_target_hidden_from_staff() {
        let caller = principal(true, false, &["change_user"]);
        assert!(matches!(
            ensure_can_target(&caller, &target(true)),
            Err(AccountError::Forbidden)
        ));
        assert!(ensure_can_target(&caller, &target(false)).is_ok());
    }

    #[test]
    fn test_changeset_privilege_fields_dropped_for_staff() {
        let caller = principal(true, false, &["change_user"]);
        let changeset = AccountChangeset {
            first_name: Some("New".to_string()),
            is_active: Some(false),
            is_staff: Some(true),
            is_superuser: Some(true),
            role_ids: Some(vec![1]),
            permission_ids: Some(vec![2]),
            ..Default::default()
        };

        let sanitized = sanitize_changeset(&caller, changeset);
        assert_eq!(sanitized.first_name.as_deref(), Some("New"));
        assert_eq!(sanitized.is_active, Some(false));
        assert_eq!(sanitized.is_staff, None);
        assert_eq!(sanitized.is_superuser, None);
        assert_eq!(sanitized.role_ids, None);
        assert_eq!(sanitized.permission_ids, None);
    }

    #[test]
    fn test_changeset_kept_for_superuser() {
        let caller = principal(true, true, &[]);
        let changeset = AccountChangeset {
            is_superuser: Some(true),
            ..Default::default()
        };
        let sanitized = sanitize_changeset(&caller, changeset);
        assert_eq!(sanitized.is_superuser, Some(true));
    }
}
