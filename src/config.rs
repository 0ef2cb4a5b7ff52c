use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mail::MailConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotebookConfig {
    pub database: PathBuf,
    pub server: ServerConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mail: Option<MailConfig>,
}

impl Default for QuotebookConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            server: ServerConfig::default(),
            mail: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 8000,
            timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("quotebook.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("quotebook.sqlite")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<QuotebookConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: QuotebookConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "Loaded config");
    Ok(Some(config))
}

/// The config at `path` (or the default location), defaults when missing.
pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<QuotebookConfig> {
    Ok(load_config(path)?.unwrap_or_default())
}

pub fn write_config(path: &Path, config: &QuotebookConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mail::TransportKind;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        assert!(load_config(Some(&path)).unwrap().is_none());
        assert_eq!(load_or_default(Some(&path)).unwrap(), QuotebookConfig::default());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotebook.toml");
        std::fs::write(
            &path,
            r#"
database = "data/quotes.sqlite"

[server]
port = 9000

[mail]
transport = "log"
receivers = ["reader@example.org"]
"#,
        )
        .unwrap();

        let config = load_or_default(Some(&path)).unwrap();
        assert_eq!(config.database, PathBuf::from("data/quotes.sqlite"));
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.timeout(), Duration::from_secs(10));

        let mail = config.mail.unwrap();
        assert_eq!(mail.transport, TransportKind::Log);
        assert_eq!(mail.interval_hours, 24);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotebook.toml");
        let config = QuotebookConfig {
            mail: Some(MailConfig::default()),
            ..Default::default()
        };

        write_config(&path, &config, false).unwrap();
        assert!(write_config(&path, &config, false).is_err());
        write_config(&path, &config, true).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap(), Some(config));
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quotebook.toml");
        std::fs::write(&path, "server = 3").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_ensure_db_dir_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("quotes.sqlite");

        ensure_db_dir(&db).unwrap();
        assert!(db.parent().unwrap().is_dir());
        ensure_db_dir(Path::new("quotes.sqlite")).unwrap();
    }
}
