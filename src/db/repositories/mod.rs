pub mod account;
pub mod auth_token;
pub mod role;
