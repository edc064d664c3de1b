//! Connection parameters resolved from the environment
//!
//! Settings are read once per process and are immutable afterwards. A `.env`
//! file in the working directory is honoured. Nothing is validated here:
//! a missing account or password surfaces later as a connection error.

use std::fmt;
use std::path::PathBuf;

/// Account identifier, e.g. `xy12345.us-east-2.aws`
pub const ACCOUNT_VAR: &str = "SF_ACCOUNT";
/// Login name
pub const USER_VAR: &str = "SF_USER";
/// Password for the login
pub const PASSWORD_VAR: &str = "SF_PASSWORD";
/// Virtual warehouse running the queries
pub const WAREHOUSE_VAR: &str = "SF_WAREHOUSE";
/// Database name
pub const DATABASE_VAR: &str = "SF_DB";
/// Schema name
pub const SCHEMA_VAR: &str = "SF_SCHEMA";
/// Optional role
pub const ROLE_VAR: &str = "SF_ROLE";
/// Directory receiving exported charts
pub const OUTPUT_VAR: &str = "SF_OUTPUT";
/// Optional base URL replacing `https://<account>.snowflakecomputing.com`
pub const HOST_VAR: &str = "SF_HOST";
/// Optional QUERY_TAG session parameter
pub const QUERY_TAG_VAR: &str = "SF_QUERY_TAG";

pub const DEFAULT_DATABASE: &str = "WALMART_DB";
pub const DEFAULT_SCHEMA: &str = "GOLD";
pub const DEFAULT_OUTPUT_DIR: &str = "/tmp/snowflake";

/// Resolved connection parameters
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub account: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub warehouse: Option<String>,
    pub database: String,
    pub schema: String,
    pub role: Option<String>,
    pub output_dir: PathBuf,
    pub host: Option<String>,
    pub query_tag: Option<String>,
}

impl Settings {
    /// Read settings from the process environment, loading `.env` first.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }
        Self::from_lookup(|name| dotenvy::var(name).ok())
    }

    /// Resolve settings through an arbitrary variable lookup.
    ///
    /// Empty values count as unset, so `SF_DB=` still falls back to the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        Self {
            account: get(ACCOUNT_VAR),
            user: get(USER_VAR),
            password: get(PASSWORD_VAR),
            warehouse: get(WAREHOUSE_VAR),
            database: get(DATABASE_VAR).unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            schema: get(SCHEMA_VAR).unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            role: get(ROLE_VAR),
            output_dir: get(OUTPUT_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            host: get(HOST_VAR),
            query_tag: get(QUERY_TAG_VAR),
        }
    }

    /// Replace the output directory (CLI override).
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    /// Base URL of the warehouse endpoint.
    ///
    /// Returns `None` when neither a host override nor an account is set.
    pub fn base_url(&self) -> Option<String> {
        if let Some(host) = &self.host {
            return Some(host.trim_end_matches('/').to_string());
        }
        self.account
            .as_ref()
            .map(|account| format!("https://{}.snowflakecomputing.com", account))
    }

    /// Account name sent in the login request: the locator before any region suffix.
    pub fn account_name(&self) -> Option<&str> {
        self.account
            .as_deref()
            .map(|account| account.split('.').next().unwrap_or(account))
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("account", &self.account)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("warehouse", &self.warehouse)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("output_dir", &self.output_dir)
            .field("host", &self.host)
            .field("query_tag", &self.query_tag)
            .finish()
    }
}
