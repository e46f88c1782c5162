use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub features: FeatureConfig,

    pub security: SecurityConfig,

    pub notices: NoticeConfig,
}

/// Lifecycle feature toggles. Passed into the engine at construction time;
/// there is no process-wide mutable settings object.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Allow self-registration through `sign_up`.
    pub sign_up_enabled: bool,

    /// Allow password sign-in through `sign_in`.
    pub sign_in_enabled: bool,

    /// When true, new sign-ups start inactive and must confirm their email
    /// through an activation link before the account becomes active.
    pub force_activation: bool,

    /// Send an invitation notice when an admin creates or activates a user
    /// that has no password yet.
    pub auto_send_invitation: bool,

    /// Require two-factor devices for staff sign-in. The core only stores and
    /// removes devices; enforcement belongs to the host application.
    pub two_factor_required: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sign_up_enabled: true,
            sign_in_enabled: true,
            force_activation: true,
            auto_send_invitation: true,
            two_factor_required: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Secret mixed into activation/reset token derivation. Must be stable
    /// across restarts or outstanding links stop validating.
    pub token_secret: String,

    /// Width of the token time bucket in seconds. Tokens issued within the
    /// same bucket are identical; `verify` also accepts the previous bucket.
    pub token_bucket_seconds: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            token_secret: String::new(),
            token_bucket_seconds: 86_400,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeConfig {
    /// Base URL prepended to activation/reset paths in outgoing notices.
    pub site_url: String,
}

impl Default for NoticeConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_self_service_flows() {
        let config = Config::default();
        assert!(config.features.sign_up_enabled);
        assert!(config.features.sign_in_enabled);
        assert!(config.features.force_activation);
        assert_eq!(config.security.token_bucket_seconds, 86_400);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [features]
            force_activation = false
            "#,
        )
        .unwrap();

        assert!(!config.features.force_activation);
        assert!(config.features.sign_up_enabled);
        assert_eq!(config.security.argon2_parallelism, 1);
    }
}
