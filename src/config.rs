//! Configuration loading via `ortho-config`.

use std::time::Duration;

use ortho_config::OrthoConfig;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::api::Endpoints;
use crate::context::Timeouts;

const CONFIG_FILE: &str = "ibmvpc.toml";
const SECTION: &str = "ibmvpc";

/// Provider settings merged from defaults, configuration files, `IC_*`
/// environment variables, and CLI flags.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "IC",
    discovery(
        app_name = "ibmvpc",
        env_var = "IBMVPC_CONFIG_PATH",
        config_file_name = "ibmvpc.toml",
        dotfile_name = ".ibmvpc.toml",
        project_file_name = "ibmvpc.toml"
    )
)]
pub struct ProviderConfig {
    /// IAM API key exchanged for bearer tokens. Required.
    #[ortho_config(default = String::new())]
    pub api_key: String,
    /// Region whose public endpoints are used. Defaults to `us-south`.
    #[ortho_config(default = "us-south".to_owned())]
    pub region: String,
    /// Override for the VPC API base URL.
    pub vpc_endpoint: Option<String>,
    /// Override for the Code Engine API base URL.
    pub code_engine_endpoint: Option<String>,
    /// Override for the global tagging API base URL.
    pub tagging_endpoint: Option<String>,
    /// Override for the IAM token URL.
    pub iam_endpoint: Option<String>,
    /// Comma-separated tags added to every tagged resource.
    pub env_tags: Option<String>,
    /// Seconds between status polls. Defaults to 10.
    #[ortho_config(default = 10)]
    pub poll_interval_secs: u64,
    /// Create timeout in seconds. Defaults to ten minutes.
    #[ortho_config(default = 600)]
    pub create_timeout_secs: u64,
    /// Update timeout in seconds. Defaults to ten minutes.
    #[ortho_config(default = 600)]
    pub update_timeout_secs: u64,
    /// Delete timeout in seconds. Defaults to ten minutes.
    #[ortho_config(default = 600)]
    pub delete_timeout_secs: u64,
    /// Console base URL used to build dashboard links.
    #[ortho_config(default = "https://cloud.ibm.com".to_owned())]
    pub console_url: String,
}

/// Metadata for a configuration field, used to generate actionable error messages.
struct FieldMetadata {
    description: &'static str,
    env_var: &'static str,
    toml_key: &'static str,
}

impl FieldMetadata {
    const fn new(description: &'static str, env_var: &'static str, toml_key: &'static str) -> Self {
        Self {
            description,
            env_var,
            toml_key,
        }
    }

    fn hint(&self) -> String {
        format!(
            "set {} or add {} to [{SECTION}] in {CONFIG_FILE}",
            self.env_var, self.toml_key
        )
    }
}

impl ProviderConfig {
    fn require_field(value: &str, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(format!(
                "missing {}: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    fn require_positive(value: u64, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        if value == 0 {
            return Err(ConfigError::Invalid(format!(
                "{} must be greater than zero: {}",
                metadata.description,
                metadata.hint()
            )));
        }
        Ok(())
    }

    fn require_url(value: Option<&str>, metadata: &FieldMetadata) -> Result<(), ConfigError> {
        let Some(raw) = value else {
            return Ok(());
        };
        Url::parse(raw).map(drop).map_err(|err| {
            ConfigError::Invalid(format!(
                "{} '{raw}' is not a valid URL ({err}): {}",
                metadata.description,
                metadata.hint()
            ))
        })
    }

    /// Loads configuration using the `ortho-config` derive. Values merge
    /// defaults, configuration files, environment variables, and CLI flags in
    /// that order of precedence.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the loader fails to merge sources.
    pub fn load_from_sources() -> Result<Self, ConfigError> {
        Self::load().map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Loads configuration without attempting to parse CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("ibmvpc")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that supply each value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when a required value is blank
    /// and [`ConfigError::Invalid`] when a value is out of range or malformed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::require_field(
            &self.api_key,
            &FieldMetadata::new("IBM Cloud API key", "IC_API_KEY", "api_key"),
        )?;
        Self::require_field(
            &self.region,
            &FieldMetadata::new("region", "IC_REGION", "region"),
        )?;
        Self::require_positive(
            self.poll_interval_secs,
            &FieldMetadata::new(
                "poll interval",
                "IC_POLL_INTERVAL_SECS",
                "poll_interval_secs",
            ),
        )?;
        Self::require_positive(
            self.create_timeout_secs,
            &FieldMetadata::new(
                "create timeout",
                "IC_CREATE_TIMEOUT_SECS",
                "create_timeout_secs",
            ),
        )?;
        Self::require_positive(
            self.update_timeout_secs,
            &FieldMetadata::new(
                "update timeout",
                "IC_UPDATE_TIMEOUT_SECS",
                "update_timeout_secs",
            ),
        )?;
        Self::require_positive(
            self.delete_timeout_secs,
            &FieldMetadata::new(
                "delete timeout",
                "IC_DELETE_TIMEOUT_SECS",
                "delete_timeout_secs",
            ),
        )?;
        Self::require_url(
            self.vpc_endpoint.as_deref(),
            &FieldMetadata::new("VPC endpoint", "IC_VPC_ENDPOINT", "vpc_endpoint"),
        )?;
        Self::require_url(
            self.code_engine_endpoint.as_deref(),
            &FieldMetadata::new(
                "Code Engine endpoint",
                "IC_CODE_ENGINE_ENDPOINT",
                "code_engine_endpoint",
            ),
        )?;
        Self::require_url(
            self.tagging_endpoint.as_deref(),
            &FieldMetadata::new(
                "tagging endpoint",
                "IC_TAGGING_ENDPOINT",
                "tagging_endpoint",
            ),
        )?;
        Self::require_url(
            self.iam_endpoint.as_deref(),
            &FieldMetadata::new("IAM endpoint", "IC_IAM_ENDPOINT", "iam_endpoint"),
        )?;
        Self::require_url(
            Some(&self.console_url),
            &FieldMetadata::new("console URL", "IC_CONSOLE_URL", "console_url"),
        )?;
        Ok(())
    }

    /// Splits the `env_tags` value into individual tags, trimming whitespace
    /// and dropping empty entries.
    #[must_use]
    pub fn env_tags(&self) -> Vec<String> {
        self.env_tags
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Endpoints for the configured region with overrides applied.
    #[must_use]
    pub fn endpoints(&self) -> Endpoints {
        let defaults = Endpoints::for_region(&self.region);
        Endpoints {
            vpc: self.vpc_endpoint.clone().unwrap_or(defaults.vpc),
            code_engine: self
                .code_engine_endpoint
                .clone()
                .unwrap_or(defaults.code_engine),
            tagging: self.tagging_endpoint.clone().unwrap_or(defaults.tagging),
            iam: self.iam_endpoint.clone().unwrap_or(defaults.iam),
        }
    }

    /// Interval between status polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-operation wait budgets.
    #[must_use]
    pub const fn timeouts(&self) -> Timeouts {
        Timeouts {
            create: Duration::from_secs(self.create_timeout_secs),
            update: Duration::from_secs(self.update_timeout_secs),
            delete: Duration::from_secs(self.delete_timeout_secs),
        }
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is out of range or malformed.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}

impl From<ortho_config::OrthoError> for ConfigError {
    fn from(value: ortho_config::OrthoError) -> Self {
        Self::Parse(value.to_string())
    }
}
