//! Database connection settings for SQL deployment.
//!
//! Read once from the process environment (and a `.env` file when present)
//! and handed to the deployment runner by reference.

use std::fmt;

pub const SERVER_VAR: &str = "SQL_SERVER";
pub const USER_VAR: &str = "SQL_USER";
pub const PASSWORD_VAR: &str = "SQL_PASS";
pub const DATABASE_VAR: &str = "SQL_DB";
pub const CLIENT_VAR: &str = "SQL_CLIENT";

pub const DEFAULT_CLIENT: &str = "sqlcmd";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load environment file: {0}")]
    EnvLoad(#[from] dotenvy::Error),
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),
}

#[derive(Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub server: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Command-line client executable.
    pub client: String,
}

impl DeployConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv()?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::MissingVar(key))
        };

        Ok(Self {
            server: required(SERVER_VAR)?,
            user: required(USER_VAR)?,
            password: required(PASSWORD_VAR)?,
            database: required(DATABASE_VAR)?,
            client: lookup(CLIENT_VAR)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CLIENT.to_string()),
        })
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("server", &self.server)
            .field("user", &self.user)
            .field("password", &"***")
            .field("database", &self.database)
            .field("client", &self.client)
            .finish()
    }
}

/// Loads `.env` from the current directory or a parent; a missing file is fine.
pub fn load_dotenv() -> Result<(), ConfigError> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    const FULL: [(&str, &str); 4] = [
        ("SQL_SERVER", "db.internal,1433"),
        ("SQL_USER", "deployer"),
        ("SQL_PASS", "hunter2"),
        ("SQL_DB", "Q360"),
    ];

    #[test]
    fn test_from_lookup() {
        let config = DeployConfig::from_lookup(lookup(&FULL)).unwrap();
        assert_eq!(config.server, "db.internal,1433");
        assert_eq!(config.user, "deployer");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.database, "Q360");
        assert_eq!(config.client, "sqlcmd");
    }

    #[test]
    fn test_client_override() {
        let mut pairs = FULL.to_vec();
        pairs.push(("SQL_CLIENT", "/opt/mssql-tools/bin/sqlcmd"));
        let config = DeployConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.client, "/opt/mssql-tools/bin/sqlcmd");
    }

    #[test]
    fn test_missing_var() {
        let err = DeployConfig::from_lookup(lookup(&FULL[..3])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("SQL_DB")));
    }

    #[test]
    fn test_empty_var_is_missing() {
        let mut pairs = FULL.to_vec();
        pairs[1] = ("SQL_USER", "  ");
        let err = DeployConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("SQL_USER")));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DeployConfig::from_lookup(lookup(&FULL)).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("deployer"));
    }
}
