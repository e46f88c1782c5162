pub mod account_service;
pub use account_service::{
    AccountError, AccountService, AccountSummary, Credentials, SignInResult, SignUpRequest,
    SignUpResult, UpdateDetailsRequest,
};

pub mod account_service_impl;
pub use account_service_impl::{LifecycleObserver, SeaOrmAccountService};

pub mod admin_service;
pub use admin_service::{AdminService, CreateUserRequest};

pub mod admin_service_impl;
pub use admin_service_impl::SeaOrmAdminService;

pub mod authorization;
pub use authorization::{AdminPermission, Principal};
