use serde::Deserialize;
use std::path::Path;

use crate::error::{RemovalError, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub secrets: Secrets,
    #[serde(default)]
    pub salesforce: SalesforceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub requests: RequestsConfig,
}

/// Credentials from the `[secrets]` section. Keys are written upper-case in
/// `sfdc.ini`, lower-case when they arrive through the environment.
#[derive(Deserialize, Clone)]
pub struct Secrets {
    #[serde(alias = "SFDC_USERNAME")]
    pub sfdc_username: String,
    #[serde(alias = "SFDC_PASSWORD")]
    pub sfdc_password: String,
    #[serde(alias = "SFDC_TOKEN")]
    pub sfdc_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("sfdc_username", &self.sfdc_username)
            .field("sfdc_password", &"<redacted>")
            .field("sfdc_token", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SalesforceConfig {
    pub login_url: String,
    pub api_version: String,
    pub lightning_url: String,
    pub household_record_type_id: String,
    pub poll_interval_ms: u64,
    pub bulk_timeout_secs: u64,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            login_url: "https://login.salesforce.com".to_string(),
            api_version: "59.0".to_string(),
            lightning_url: "https://rs.lightning.force.com".to_string(),
            household_record_type_id: "012d0000000W68QAAS".to_string(),
            poll_interval_ms: 2000,
            bulk_timeout_secs: 600,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub exports_dir: String,
    pub results_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            exports_dir: "exports".to_string(),
            results_dir: "results".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RequestsConfig {
    pub task_assignee: String,
    pub email_chunk_size: usize,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            task_assignee: "Salesforce".to_string(),
            email_chunk_size: 400,
        }
    }
}

impl Config {
    /// Load `path` (INI) with `SFDC_REMOVAL_*` environment overrides, e.g.
    /// `SFDC_REMOVAL_SECRETS__SFDC_TOKEN`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let path = path.as_ref();
        if !path.exists() {
            return Err(RemovalError::Config(format!(
                "{} does not exist.",
                path.display()
            )));
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Ini))
            .add_source(
                config::Environment::with_prefix("SFDC_REMOVAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let secrets = &self.secrets;
        let missing = [
            ("SFDC_USERNAME", &secrets.sfdc_username),
            ("SFDC_PASSWORD", &secrets.sfdc_password),
            ("SFDC_TOKEN", &secrets.sfdc_token),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if !missing.is_empty() {
            return Err(RemovalError::Config(format!(
                "One or more SFDC credentials are not set in config file: {}",
                missing.join(", ")
            )));
        }

        if self.requests.email_chunk_size == 0 {
            return Err(RemovalError::Config(
                "requests.email_chunk_size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
