//! Shared vocabulary for the account lifecycle.

use std::fmt;

/// Domain rejection codes surfaced to callers as 400-class results.
///
/// The string forms are a compatibility contract with existing clients and
/// must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionCode {
    UserInvalid,
    TokenInvalid,
    UserInactive,
    UserActive,
    SignUpDisabled,
    SignInDisabled,
}

impl RejectionCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UserInvalid => "USER_INVALID",
            Self::TokenInvalid => "TOKEN_INVALID",
            Self::UserInactive => "USER_INACTIVE",
            Self::UserActive => "USER_ACTIVE",
            Self::SignUpDisabled => "SIGN_UP_DISABLED",
            Self::SignInDisabled => "SIGN_IN_DISABLED",
        }
    }
}

impl fmt::Display for RejectionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Success codes returned by token-gated lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCode {
    Activated,
    ActivationSent,
    PasswordReset,
    TokenValid,
    PasswordSet,
}

impl LifecycleCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activated => "ACTIVATED",
            Self::ActivationSent => "ACTIVATION_SENT",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::TokenValid => "TOKEN_VALID",
            Self::PasswordSet => "PASSWORD_SET",
        }
    }
}

impl fmt::Display for LifecycleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a derived token authorizes. Mixed into the token derivation so an
/// activation link can never validate a reset request and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    Activation,
    PasswordReset,
}

impl TokenPurpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activation => "activation",
            Self::PasswordReset => "password-reset",
        }
    }
}

/// A committed state transition, handed to registered observers after the
/// storage transaction commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    SignedUp { uuid: String },
    Activated { uuid: String },
    SignedIn { uuid: String },
    PasswordResetRequested { uuid: String },
    PasswordSet { uuid: String },
    PasswordChanged { uuid: String },
    DetailsUpdated { uuid: String },
}
