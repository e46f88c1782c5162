pub mod prelude;

pub mod account_permissions;
pub mod account_roles;
pub mod accounts;
pub mod auth_tokens;
pub mod permissions;
pub mod profiles;
pub mod role_permissions;
pub mod roles;
pub mod two_factor_devices;
