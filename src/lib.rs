//! Pluggable account lifecycle engine: registration, email activation,
//! sign-in with bearer tokens, password reset and administrative user
//! management, backed by `SeaORM` over SQLite.
//!
//! The crate is transport-agnostic. Hosts wire the services behind their own
//! HTTP layer and implement [`notify::Notifier`] for delivery.

pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod notify;
pub mod services;
pub mod token;
pub mod validation;

pub use config::Config;
pub use db::Store;
pub use domain::{LifecycleCode, LifecycleEvent, RejectionCode, TokenPurpose};
pub use notify::{LogNotifier, Notice, NoticeKind, Notifier};
pub use services::{
    AccountError, AccountService, AccountSummary, AdminPermission, AdminService, Credentials,
    CreateUserRequest, Principal, SeaOrmAccountService, SeaOrmAdminService, SignInResult,
    SignUpRequest, SignUpResult, UpdateDetailsRequest,
};
pub use token::TokenService;
