use std::path::{Path, PathBuf};

use fleetroute_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

/// Environment variables that override file-based settings.
pub const ENV_DB_PATH: &str = "DB_PATH";
pub const ENV_MIGRATIONS_DIR: &str = "MIGRATIONS_DIR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_HOST: &str = "HOST";

/// Resolves an `AppConfig` from an optional file plus environment overrides.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Default config location: `~/.fleetroute/config.yml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".fleetroute").join("config.yml"))
    }

    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present and built-in defaults otherwise. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<AppConfig> {
        let config = match path {
            Some(p) => Self::from_file(p)?,
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(p) => Self::from_file(&p)?,
                None => {
                    debug!("no config file found, using defaults");
                    AppConfig::default()
                }
            },
        };

        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    /// Parse a YAML or TOML config file, chosen by extension.
    pub fn from_file(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            config.database.path = PathBuf::from(path);
        }
        if let Some(dir) = lookup(ENV_MIGRATIONS_DIR) {
            config.database.migrations_dir = PathBuf::from(dir);
        }
        if let Some(host) = lookup(ENV_HOST) {
            config.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            config.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid {ENV_PORT} value: {port}")))?;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_original_layout() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.path, PathBuf::from("./db/data.sqlite"));
        assert_eq!(
            config.database.migrations_dir,
            PathBuf::from("./db/migrations")
        );
    }

    #[test]
    fn env_overrides_take_precedence() {
        let config = ConfigLoader::apply_overrides(
            AppConfig::default(),
            lookup_from(&[
                ("DB_PATH", "/tmp/fleet.sqlite"),
                ("MIGRATIONS_DIR", "/srv/migrations"),
                ("PORT", "9090"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/fleet.sqlite"));
        assert_eq!(
            config.database.migrations_dir,
            PathBuf::from("/srv/migrations")
        );
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn invalid_port_override_is_rejected() {
        let err = ConfigLoader::apply_overrides(AppConfig::default(), lookup_from(&[("PORT", "http")]))
            .unwrap_err();
        assert!(err.to_string().contains("invalid PORT value"));
    }

    #[test]
    fn parses_yaml_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "server:\n  port: 3000\ndatabase:\n  migrations_dir: sql").unwrap();

        let config = ConfigLoader::from_file(&path).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.migrations_dir, PathBuf::from("sql"));
        assert_eq!(config.database.path, PathBuf::from("./db/data.sqlite"));
    }

    #[test]
    fn parses_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[log]\nlevel = \"debug\"\njson = true\n").unwrap();

        let config = ConfigLoader::from_file(&path).unwrap();
        assert_eq!(config.log.level, "debug");
        assert!(config.log.json);
    }

    #[test]
    fn unknown_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "port=1").unwrap();

        let err = ConfigLoader::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config extension: ini"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigLoader::load(Some(&dir.path().join("absent.yml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
