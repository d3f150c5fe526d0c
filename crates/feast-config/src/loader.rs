//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;

use feast_telemetry::LogFormat;

use crate::{ConfigError, FeastConfig};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "FEAST";

/// Builds a [`FeastConfig`] from layers, later layers winning:
///
/// 1. defaults or a preset
/// 2. a TOML or JSON file
/// 3. `PREFIX__SECTION__KEY` environment variables
///
/// # Example
///
/// ```no_run
/// use feast_config::ConfigLoader;
///
/// # fn main() -> Result<(), feast_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("feast.toml")?
///     .with_dotenv()?
///     .with_env_prefix("FEAST")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: FeastConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Starts from [`FeastConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from [`FeastConfig::development`].
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = FeastConfig::development();
        self
    }

    /// Starts from [`FeastConfig::production`].
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = FeastConfig::production();
        self
    }

    /// Loads a file, picking the format from its extension.
    ///
    /// The file replaces the current layer. Sections or keys it omits take
    /// their defaults, not the values of a preset.
    ///
    /// # Errors
    ///
    /// Fails when the file is missing, unreadable, malformed, has an
    /// unsupported extension or contains unknown keys.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &format).map_err(|e| match e {
            ConfigError::ValidationError(_) => ConfigError::validation_error(format!(
                "unsupported configuration file format: {}",
                path.display()
            )),
            other => other,
        })?;

        Ok(self)
    }

    /// Like [`ConfigLoader::with_file`], but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Loads configuration from a string in `toml` or `json` format.
    ///
    /// # Errors
    ///
    /// Fails on malformed content, unknown keys or an unknown format.
    ///
    /// # Example
    ///
    /// ```
    /// use feast_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[api]\njsonp_enabled = false", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(!config.api.jsonp_enabled);
    /// assert!(config.api.enabled);
    /// ```
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables environment overrides under `prefix`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the working directory into the process environment.
    /// A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be parsed.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(_) => Ok(self),
            Err(e) if e.not_found() => Ok(self),
            Err(e) => Err(ConfigError::Dotenv(e.to_string())),
        }
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails on an unparsable override or a validation failure.
    pub fn load(mut self) -> Result<FeastConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(&prefix))
                .collect();
            for (key, value) in vars {
                self.apply_env_var(&key, &value, &prefix)?;
            }
        }

        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the current layer without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> FeastConfig {
        self.config
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> Result<(), ConfigError> {
        let Some(path) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            // FEASTY_THING and friends share the prefix but not the separator
            return Ok(());
        };

        let parts: Vec<&str> = path.split("__").collect();
        let c = &mut self.config;

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => c.server.http_addr = value.to_string(),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                c.server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                c.server.request_timeout_ms = parse_number(key, value)?;
            }
            ["SERVER", "MAX_CONNECTIONS"] => {
                c.server.max_connections = parse_number(key, value)?;
            }
            ["SERVER", "MAX_BODY_SIZE"] => {
                c.server.max_body_size = parse_number(key, value)?;
            }

            ["API", "ENABLED"] => c.api.enabled = parse_flag(key, value)?,
            ["API", "JSONP_ENABLED"] => c.api.jsonp_enabled = parse_flag(key, value)?,
            ["API", "ROUTE_PREFIX"] => c.api.route_prefix = value.to_string(),
            ["API", "CHARSET"] => c.api.charset = value.to_string(),

            ["LOGGING", "ENABLED"] => c.logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => c.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                c.logging.format = value
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected 'json' or 'pretty'"))?;
            }

            ["METRICS", "ENABLED"] => c.metrics.enabled = parse_flag(key, value)?,
            ["METRICS", "ADDR"] => c.metrics.addr = value.to_string(),

            _ => {}
        }

        Ok(())
    }
}

fn parse(content: &str, format: &str) -> Result<FeastConfig, ConfigError> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        _ => Err(ConfigError::validation_error(format!(
            "unsupported configuration format: {format}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

/// Parses `true/false`, `1/0`, `yes/no` or `on/off`, case-insensitively.
pub(crate) fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loader_defaults() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, FeastConfig::default());
    }

    #[test]
    fn test_loader_presets() {
        let dev = ConfigLoader::new().with_development().load().unwrap();
        assert_eq!(dev.logging.format, LogFormat::Pretty);
        let prod = ConfigLoader::new().with_production().load().unwrap();
        assert!(prod.metrics.enabled);
    }

    #[test]
    fn test_loader_string_json() {
        let json = r#"{"api": {"route_prefix": "/api", "charset": "ISO-8859-1"}}"#;
        let config = ConfigLoader::new()
            .with_string(json, "JSON")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.api.route_prefix, "/api");
        assert_eq!(config.api.charset, "ISO-8859-1");
    }

    #[test]
    fn test_loader_unknown_format() {
        assert!(matches!(
            ConfigLoader::new().with_string("", "yaml"),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_loader_unknown_section_rejected() {
        let result = ConfigLoader::new().with_string("[cache]\nttl = 3", "toml");
        assert!(matches!(result, Err(ConfigError::TomlError(_))));
    }

    #[test]
    fn test_loader_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [server]
            http_addr = "127.0.0.1:9000"

            [[auth.users]]
            username = "admin"
            password = "hunter2"
            roles = ["administrator"]
            "#
        )
        .unwrap();

        let config = ConfigLoader::new().with_file(file.path()).unwrap().load().unwrap();
        assert_eq!(config.server.http_addr, "127.0.0.1:9000");
        assert_eq!(config.auth.users.len(), 1);
        assert_eq!(config.auth.users[0].roles, vec!["administrator"]);
    }

    #[test]
    fn test_loader_file_bad_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let err = ConfigLoader::new().with_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("unsupported configuration file format"));
    }

    #[test]
    fn test_loader_missing_files() {
        assert!(matches!(
            ConfigLoader::new().with_file("/nonexistent/feast.toml"),
            Err(ConfigError::FileNotFound { .. })
        ));
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/feast.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config, FeastConfig::default());
    }

    #[test]
    fn test_loader_validation_runs() {
        let result = ConfigLoader::new()
            .with_string("[server]\nhttp_addr = \"nowhere\"", "toml")
            .unwrap()
            .load();
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    // set_var needs unsafe on newer editions; exercise the override table directly.

    #[test]
    fn test_apply_env_var_api_switches() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("FEAST__API__ENABLED", "off", "FEAST").unwrap();
        loader.apply_env_var("FEAST__API__JSONP_ENABLED", "0", "FEAST").unwrap();
        loader.apply_env_var("FEAST__API__ROUTE_PREFIX", "/v1", "FEAST").unwrap();
        let config = loader.load_unvalidated();
        assert!(!config.api.enabled);
        assert!(!config.api.jsonp_enabled);
        assert_eq!(config.api.route_prefix, "/v1");
    }

    #[test]
    fn test_apply_env_var_server_and_logging() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("FEAST__SERVER__REQUEST_TIMEOUT_MS", "250", "FEAST").unwrap();
        loader.apply_env_var("FEAST__SERVER__MAX_BODY_SIZE", "4096", "FEAST").unwrap();
        loader.apply_env_var("FEAST__LOGGING__FORMAT", "Pretty", "FEAST").unwrap();
        loader.apply_env_var("FEAST__METRICS__ENABLED", "yes", "FEAST").unwrap();
        let config = loader.load_unvalidated();
        assert_eq!(config.server.request_timeout_ms, 250);
        assert_eq!(config.server.max_body_size, 4096);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_apply_env_var_errors() {
        let mut loader = ConfigLoader::new();
        assert!(loader
            .apply_env_var("FEAST__SERVER__MAX_CONNECTIONS", "many", "FEAST")
            .is_err());
        assert!(loader.apply_env_var("FEAST__API__ENABLED", "maybe", "FEAST").is_err());
        assert!(loader.apply_env_var("FEAST__LOGGING__FORMAT", "xml", "FEAST").is_err());
    }

    #[test]
    fn test_apply_env_var_ignores_unrelated() {
        let mut loader = ConfigLoader::new();
        loader.apply_env_var("FEASTY_THING", "x", "FEAST").unwrap();
        loader.apply_env_var("FEAST__CACHE__TTL", "x", "FEAST").unwrap();
        assert_eq!(loader.load_unvalidated(), FeastConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(yes), Some(true), "{yes}");
        }
        for no in ["false", "False", "0", "no", "off"] {
            assert_eq!(parse_bool(no), Some(false), "{no}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
