use std::env;

use crate::error::{Error, Result};

const DEFAULT_DATABASE_URL: &str = "sqlite:campus_vote.db";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Connection settings for the election store, read from `DATABASE_URL` and
/// `DATABASE_MAX_CONNECTIONS`. Load a `.env` file with `dotenvy` first if you
/// want one to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(raw) => Self::parse_max_connections(&raw)?,
            Err(_) => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    /// A private in-memory database. Every connection to `sqlite::memory:`
    /// opens a fresh database, so the pool is capped at one connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            max_connections: 1,
        }
    }

    /// Whether the URL names an SQLite in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }

    fn parse_max_connections(raw: &str) -> Result<u32> {
        match raw.trim().parse::<u32>() {
            Ok(0) => Err(Error::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            )),
            Ok(n) => Ok(n),
            Err(e) => Err(Error::Config(format!(
                "DATABASE_MAX_CONNECTIONS is not a number ({}): {}",
                raw, e
            ))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connection_limit() {
        assert_eq!(Config::parse_max_connections(" 8 ").unwrap(), 8);
    }

    #[test]
    fn rejects_zero_and_garbage_limits() {
        assert!(matches!(
            Config::parse_max_connections("0"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            Config::parse_max_connections("lots"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn in_memory_uses_single_connection() {
        let config = Config::in_memory();
        assert_eq!(config.max_connections, 1);
        assert!(config.is_in_memory());
    }

    #[test]
    fn file_urls_are_not_in_memory() {
        assert!(!Config::default().is_in_memory());
        let shared = Config {
            database_url: "sqlite:file:elections?mode=memory&cache=shared".to_string(),
            max_connections: 4,
        };
        assert!(shared.is_in_memory());
    }
}
