use crate::constants::*;
use crate::error::{ApiError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub undl: UndlConfig,
    pub graph: GraphConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub log_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            debug: false,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UndlConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub page_size: u32,
    pub timeout_seconds: u64,
    pub verbose: bool,
}

impl Default for UndlConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_UNDL_BASE_URL.to_string(),
            api_key: None,
            page_size: DEFAULT_UNDL_PAGE_SIZE,
            timeout_seconds: DEFAULT_UNDL_TIMEOUT_SECONDS,
            verbose: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub uri: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub timeout_seconds: u64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            uri: DEFAULT_GRAPH_URI.to_string(),
            user: None,
            password: None,
            database: DEFAULT_GRAPH_DATABASE.to_string(),
            timeout_seconds: DEFAULT_GRAPH_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus listener address; no exporter when unset
    pub addr: Option<String>,
}

impl Config {
    /// Read the optional TOML file, then apply overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ApiError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Overlay values found through `lookup` (normally the environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SEMUN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SEMUN_PORT").or_else(|| lookup("PORT")) {
            self.server.port = parse_number("SEMUN_PORT", &port)?;
        }
        if let Some(debug) = lookup("SEMUN_DEBUG") {
            self.server.debug = parse_flag(&debug);
        }
        if let Some(dir) = lookup("SEMUN_LOG_DIR") {
            self.server.log_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("UNDL_BASE_URL") {
            self.undl.base_url = url;
        }
        if let Some(key) = lookup("UNDL_API_KEY") {
            self.undl.api_key = non_empty(key);
        }
        if let Some(size) = lookup("UNDL_PAGE_SIZE") {
            self.undl.page_size = parse_number("UNDL_PAGE_SIZE", &size)?;
        }
        if let Some(timeout) = lookup("UNDL_TIMEOUT_SECONDS") {
            self.undl.timeout_seconds = parse_number("UNDL_TIMEOUT_SECONDS", &timeout)?;
        }
        if let Some(verbose) = lookup("UNDL_VERBOSE") {
            self.undl.verbose = parse_flag(&verbose);
        }

        if let Some(uri) = lookup("NEO4J_URI") {
            self.graph.uri = uri;
        }
        if let Some(user) = lookup("NEO4J_USER") {
            self.graph.user = non_empty(user);
        }
        if let Some(password) = lookup("NEO4J_PASSWORD") {
            self.graph.password = non_empty(password);
        }
        if let Some(database) = lookup("NEO4J_DATABASE") {
            self.graph.database = database;
        }

        if let Some(addr) = lookup("SEMUN_METRICS_ADDR") {
            self.metrics.addr = non_empty(addr);
        }

        self.validate()
    }

    fn validate(&self) -> Result<()> {
        if self.undl.page_size == 0 {
            return Err(ApiError::Config(
                "undl.page_size must be greater than zero".to_string(),
            ));
        }
        if self.undl.base_url.trim().is_empty() {
            return Err(ApiError::Config("undl.base_url must not be empty".to_string()));
        }
        if self.graph.uri.trim().is_empty() {
            return Err(ApiError::Config("graph.uri must not be empty".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ApiError::Config(format!("{key} must be a number, got '{raw}'")))
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert!(!config.server.debug);
        assert_eq!(config.undl.base_url, "https://digitallibrary.un.org/api/v1");
        assert_eq!(config.graph.uri, "bolt://neo4j.un-semun.orb.local:7687");
        assert!(config.graph.user.is_none());
        assert!(config.metrics.addr.is_none());
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\n\n[graph]\nuri = \"http://graph.local:7474\"\nuser = \"reader\""
        )
        .unwrap();

        let mut config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.graph.user.as_deref(), Some("reader"));

        config
            .apply_overrides(env(&[
                ("SEMUN_PORT", "9100"),
                ("NEO4J_URI", "bolt://other:7687"),
                ("UNDL_API_KEY", "secret"),
            ]))
            .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.graph.uri, "bolt://other:7687");
        assert_eq!(config.graph.user.as_deref(), Some("reader"));
        assert_eq!(config.undl.api_key.as_deref(), Some("secret"));
        assert_eq!(config.undl.page_size, 10);
    }

    #[test]
    fn test_port_falls_back_to_plain_port_variable() {
        let mut config = Config::default();
        config.apply_overrides(env(&[("PORT", "3000")])).unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_debug_flag_parsing() {
        for (raw, expected) in [("1", true), ("TRUE", true), ("on", true), ("0", false), ("", false), ("false", false)] {
            let mut config = Config::default();
            config.apply_overrides(env(&[("SEMUN_DEBUG", raw)])).unwrap();
            assert_eq!(config.server.debug, expected, "SEMUN_DEBUG={raw:?}");
        }
    }

    #[test]
    fn test_malformed_number_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(env(&[("UNDL_PAGE_SIZE", "ten")]))
            .unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_zero_page_size_is_rejected() {
        let mut config = Config::default();
        assert!(config.apply_overrides(env(&[("UNDL_PAGE_SIZE", "0")])).is_err());
    }

    #[test]
    fn test_blank_credentials_are_treated_as_unset() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("NEO4J_USER", ""), ("NEO4J_PASSWORD", "  ")]))
            .unwrap();
        assert!(config.graph.user.is_none());
        assert!(config.graph.password.is_none());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::from_file(Path::new("/nonexistent/semun.toml")).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }
}
