pub use super::account_permissions::Entity as AccountPermissions;
pub use super::account_roles::Entity as AccountRoles;
pub use super::accounts::Entity as Accounts;
pub use super::auth_tokens::Entity as AuthTokens;
pub use super::permissions::Entity as Permissions;
pub use super::profiles::Entity as Profiles;
pub use super::role_permissions::Entity as RolePermissions;
pub use super::roles::Entity as Roles;
pub use super::two_factor_devices::Entity as TwoFactorDevices;
