//! Configuration module for the fake MySQL server.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Command-line arguments for the fake server
#[derive(Parser, Debug)]
#[command(name = "fake-mysql-server")]
#[command(version)]
#[command(about = "A fake MySQL server for driver test suites", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to bind to (e.g., 127.0.0.1:3306)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Server version string sent in the greeting
    #[arg(long)]
    pub server_version: Option<String>,

    /// Maximum number of concurrent connections
    #[arg(short = 'n', long)]
    pub max_connections: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Version string advertised to clients
    #[serde(default = "default_server_version")]
    pub server_version: String,
    /// Maximum concurrent connections
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            server_version: default_server_version(),
            max_connections: default_max_connections(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:3306".to_string()
}

fn default_server_version() -> String {
    "5.7.0-fake".to_string()
}

fn default_max_connections() -> usize {
    1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub listen: String,
    pub server_version: String,
    pub max_connections: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self::merge(
            CliArgs {
                config: None,
                listen: None,
                server_version: None,
                max_connections: None,
                log_level: None,
            },
            TomlConfig::default(),
        )
    }
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(CliArgs::parse())
    }

    /// Resolve parsed CLI args, reading the TOML file they point at.
    pub fn from_cli(cli: CliArgs) -> Result<Self, ConfigError> {
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        let config = Self::merge(cli, toml_config);
        config.validate()?;
        Ok(config)
    }

    /// Merge CLI args over TOML values (CLI takes precedence)
    fn merge(cli: CliArgs, toml_config: TomlConfig) -> Self {
        Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            server_version: cli
                .server_version
                .unwrap_or(toml_config.server.server_version),
            max_connections: cli
                .max_connections
                .unwrap_or(toml_config.server.max_connections),
            log_level: cli.log_level.unwrap_or(toml_config.logging.level),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.server_version.as_bytes().contains(&0) {
            return Err(ConfigError::Invalid(
                "server_version must not contain NUL bytes".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    FileRead(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    TomlParse(PathBuf, #[source] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "127.0.0.1:3306");
        assert_eq!(config.server.server_version, "5.7.0-fake");
        assert_eq!(config.server.max_connections, 1024);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "0.0.0.0:13306"
            server_version = "8.0.36-fake"
            max_connections = 16

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:13306");
        assert_eq!(config.server.server_version, "8.0.36-fake");
        assert_eq!(config.server.max_connections, 16);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TomlConfig = toml::from_str("[server]\nmax_connections = 4\n").unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:3306");
        assert_eq!(config.server.max_connections, 4);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_cli_takes_precedence() {
        let cli = CliArgs::parse_from([
            "fake-mysql-server",
            "--listen",
            "127.0.0.1:0",
            "--log-level",
            "trace",
        ]);
        let toml_config: TomlConfig = toml::from_str(
            r#"
            [server]
            listen = "0.0.0.0:3306"
            server_version = "8.0-fake"

            [logging]
            level = "warn"
        "#,
        )
        .unwrap();

        let config = Config::merge(cli, toml_config);
        assert_eq!(config.listen, "127.0.0.1:0");
        assert_eq!(config.server_version, "8.0-fake");
        assert_eq!(config.log_level, "trace");
    }

    #[test]
    fn test_validation() {
        let cli = CliArgs::parse_from(["fake-mysql-server", "-n", "0"]);
        match Config::from_cli(cli) {
            Err(ConfigError::Invalid(msg)) => assert!(msg.contains("max_connections")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_missing_config_file() {
        let cli = CliArgs::parse_from(["fake-mysql-server", "-c", "/nonexistent/fake.toml"]);
        assert!(matches!(
            Config::from_cli(cli),
            Err(ConfigError::FileRead(_, _))
        ));
    }
}
