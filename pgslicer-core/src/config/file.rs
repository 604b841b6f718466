//! YAML configuration file.
//!
//! ```yaml
//! connection:
//!   host: localhost
//!   port: 5432
//!   user: reader
//!   password: ~
//! dump:
//!   limit: 50
//!   tables:
//!     users: { limit: 10, condition: "active" }
//!     countries: { limit: "*" }
//! ```
//!
//! `~` leaves a value unset. A table limit of `"*"` dumps the table in full.

use super::{ConnectionConfig, SliceOptions};
use crate::Result;
use crate::error::SlicerError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Name of the configuration file looked up in the working directory.
pub const LOCAL_FILE_NAME: &str = "pg-slicer.yml";
/// Name of the configuration file looked up in the home directory.
pub const HOME_FILE_NAME: &str = ".pg-slicer.yml";

/// Parsed `pg-slicer.yml`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub connection: ConnectionSection,
    pub dump: DumpSection,
}

/// Connection settings that may each be missing.
///
/// The same shape carries command-line and environment values, so that
/// sources can be layered with [`ConnectionSection::or`].
#[derive(Clone, Default, Deserialize, Zeroize)]
#[zeroize(drop)]
#[serde(from = "RawConnectionSection")]
pub struct ConnectionSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub database: Option<String>,
}

/// Deserialization shape of [`ConnectionSection`], which cannot be filled
/// field by field because it zeroes itself on drop.
#[derive(Default, Deserialize)]
#[serde(default)]
struct RawConnectionSection {
    host: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    password: Option<String>,
    database: Option<String>,
}

impl From<RawConnectionSection> for ConnectionSection {
    fn from(raw: RawConnectionSection) -> Self {
        Self {
            host: raw.host,
            port: raw.port,
            user: raw.user,
            password: raw.password,
            database: raw.database,
        }
    }
}

/// `dump` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DumpSection {
    pub limit: Option<usize>,
    pub tables: BTreeMap<String, Option<TableSection>>,
}

/// Per-table entry of the `dump.tables` map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TableSection {
    pub limit: Option<TableLimit>,
    pub condition: Option<String>,
}

/// Row limit of a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawTableLimit")]
pub enum TableLimit {
    Rows(usize),
    /// `"*"`
    Full,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTableLimit {
    Rows(usize),
    Text(String),
}

impl TryFrom<RawTableLimit> for TableLimit {
    type Error = String;

    fn try_from(raw: RawTableLimit) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawTableLimit::Rows(rows) => Ok(Self::Rows(rows)),
            RawTableLimit::Text(text) if text.trim() == "*" => Ok(Self::Full),
            RawTableLimit::Text(text) => Err(format!(
                "invalid table limit '{}': expected a row count or \"*\"",
                text
            )),
        }
    }
}

impl ConfigFile {
    /// Parses configuration text. `origin` names the source in errors.
    ///
    /// An empty or comment-only document yields the default configuration.
    ///
    /// # Errors
    /// Returns [`SlicerError::Yaml`] when the document is malformed.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let yaml_error = |source| SlicerError::Yaml {
            context: origin.to_string(),
            source,
        };

        let document: serde_yaml_ng::Value = serde_yaml_ng::from_str(content).map_err(yaml_error)?;
        if document.is_null() {
            return Ok(Self::default());
        }

        let mut config: Self = serde_yaml_ng::from_value(document).map_err(yaml_error)?;
        config.connection.clear_unset_markers();
        for section in config.dump.tables.values_mut().flatten() {
            if section.condition.as_deref().is_some_and(is_unset_marker) {
                section.condition = None;
            }
        }
        Ok(config)
    }

    /// Reads and parses the file at `path`.
    ///
    /// # Errors
    /// Returns an I/O error when the file cannot be read, or a YAML error
    /// when it is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| SlicerError::Io {
            context: format!("reading configuration file '{}'", path.display()),
            source,
        })?;
        let config = Self::parse(&content, &path.display().to_string())?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Finds the configuration file to use.
    ///
    /// An explicit path must exist. Otherwise `./pg-slicer.yml` is tried,
    /// then `~/.pg-slicer.yml`.
    ///
    /// # Errors
    /// Returns a configuration error when the explicit path does not exist.
    pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        let cwd = std::env::current_dir().map_err(|source| SlicerError::Io {
            context: "resolving the working directory".to_string(),
            source,
        })?;
        let home = dirs::home_dir();
        Self::locate_in(explicit, &cwd, home.as_deref())
    }

    /// [`ConfigFile::locate`] with explicit search directories.
    pub fn locate_in(
        explicit: Option<&Path>,
        cwd: &Path,
        home: Option<&Path>,
    ) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SlicerError::configuration(format!(
                "configuration file '{}' does not exist",
                path.display()
            )));
        }

        let local = cwd.join(LOCAL_FILE_NAME);
        if local.is_file() {
            return Ok(Some(local));
        }

        Ok(home
            .map(|home| home.join(HOME_FILE_NAME))
            .filter(|path| path.is_file()))
    }

    /// Locates and loads the configuration; no file yields the default.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        match Self::locate(explicit)? {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    /// Sampling options described by the `dump` section.
    pub fn slice_options(&self) -> SliceOptions {
        let mut options = SliceOptions::new();
        if let Some(limit) = self.dump.limit {
            options = options.with_limit(limit);
        }

        for (table, section) in &self.dump.tables {
            let Some(section) = section else { continue };
            options = match section.limit {
                Some(TableLimit::Rows(rows)) => options.with_table_limit(table, rows),
                Some(TableLimit::Full) => options.with_dump_full(table),
                None => options,
            };
            if let Some(condition) = &section.condition {
                options = options.with_table_condition(table, condition);
            }
        }

        options
    }
}

fn is_unset_marker(value: &str) -> bool {
    value.trim() == "~"
}

impl ConnectionSection {
    fn clear_unset_markers(&mut self) {
        for field in [
            &mut self.host,
            &mut self.user,
            &mut self.password,
            &mut self.database,
        ] {
            if field.as_deref().is_some_and(is_unset_marker) {
                field.zeroize();
            }
        }
    }

    /// Fills every unset field from `fallback`.
    pub fn or(mut self, mut fallback: Self) -> Self {
        Self {
            host: self.host.take().or_else(|| fallback.host.take()),
            port: self.port.take().or_else(|| fallback.port.take()),
            user: self.user.take().or_else(|| fallback.user.take()),
            password: self.password.take().or_else(|| fallback.password.take()),
            database: self.database.take().or_else(|| fallback.database.take()),
        }
    }

    /// Builds the connection config, applying defaults for host and port.
    ///
    /// # Errors
    /// Returns a configuration error when no database name was given.
    pub fn into_config(mut self) -> Result<ConnectionConfig> {
        let database = self.database.take().ok_or_else(|| {
            SlicerError::configuration("no database name given (DBNAME or PGDATABASE)")
        })?;

        let mut config = ConnectionConfig::new(database).with_password(self.password.take());
        if let Some(host) = self.host.take() {
            config = config.with_host(host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(user) = self.user.take() {
            config = config.with_username(user);
        }
        Ok(config)
    }
}

impl std::fmt::Debug for ConnectionSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSection")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("database", &self.database)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
connection:
  host: db.internal
  port: 6543
  user: reader
  password: ~
dump:
  limit: 50
  tables:
    users:
      limit: 10
      condition: "active"
    countries:
      limit: "*"
    audit_log: ~
"#;

    #[test]
    fn test_parse_full_document() {
        let config = ConfigFile::parse(SAMPLE, "inline").unwrap();

        assert_eq!(config.connection.host.as_deref(), Some("db.internal"));
        assert_eq!(config.connection.port, Some(6543));
        assert_eq!(config.connection.user.as_deref(), Some("reader"));
        assert!(config.connection.password.is_none());
        assert_eq!(config.dump.limit, Some(50));
        assert_eq!(
            config.dump.tables.get("countries"),
            Some(&Some(TableSection {
                limit: Some(TableLimit::Full),
                condition: None,
            }))
        );
    }

    #[test]
    fn test_partial_connection_section() {
        let config = ConfigFile::parse("connection:\n  password: s3cret\n", "inline").unwrap();

        assert_eq!(config.connection.password.as_deref(), Some("s3cret"));
        assert!(config.connection.host.is_none());
        assert!(config.connection.port.is_none());
        assert!(config.dump.tables.is_empty());
        assert!(!format!("{:?}", config.connection).contains("s3cret"));
    }

    #[test]
    fn test_slice_options_from_dump_section() {
        let options = ConfigFile::parse(SAMPLE, "inline").unwrap().slice_options();

        assert_eq!(options.limit, 50);
        assert_eq!(options.limit_for("users"), Some(10));
        assert_eq!(options.condition_for("users"), Some("active"));
        assert_eq!(options.limit_for("countries"), None);
        assert_eq!(options.limit_for("audit_log"), Some(50));
    }

    #[test]
    fn test_quoted_tilde_is_unset() {
        let config = ConfigFile::parse("connection:\n  host: '~'\n  user: admin\n", "inline")
            .unwrap();
        assert!(config.connection.host.is_none());
        assert_eq!(config.connection.user.as_deref(), Some("admin"));
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = ConfigFile::parse("# nothing here\n", "inline").unwrap();
        assert!(config.dump.tables.is_empty());
        assert_eq!(config.slice_options(), SliceOptions::default());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let err = ConfigFile::parse("dump: [unclosed", "broken.yml").unwrap_err();
        assert!(matches!(err, SlicerError::Yaml { .. }));
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn test_invalid_table_limit_is_an_error() {
        let result = ConfigFile::parse("dump:\n  tables:\n    users: { limit: all }\n", "inline");
        assert!(result.is_err());
    }

    #[test]
    fn test_connection_section_layering() {
        let cli = ConnectionSection {
            host: Some("cli-host".to_string()),
            port: None,
            user: None,
            password: None,
            database: Some("shop".to_string()),
        };
        let file = ConnectionSection {
            host: Some("file-host".to_string()),
            port: Some(6000),
            user: None,
            password: Some("from-file".to_string()),
            database: None,
        };

        let config = cli.or(file).into_config().unwrap();
        assert_eq!(config.host, "cli-host");
        assert_eq!(config.port, 6000);
        assert_eq!(config.database, "shop");
        assert!(config.credentials.has_password());
        assert!(!config.credentials.has_username());
    }

    #[test]
    fn test_into_config_requires_database() {
        let err = ConnectionSection::default().into_config().unwrap_err();
        assert!(err.to_string().contains("database"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut section = ConnectionSection::default();
        section.password = Some("hunter2".to_string());
        assert!(!format!("{:?}", section).contains("hunter2"));
    }

    #[test]
    fn test_locate_prefers_working_directory() {
        let cwd = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        std::fs::write(home.path().join(HOME_FILE_NAME), "dump: { limit: 1 }\n").unwrap();

        let found = ConfigFile::locate_in(None, cwd.path(), Some(home.path())).unwrap();
        assert_eq!(found, Some(home.path().join(HOME_FILE_NAME)));

        std::fs::write(cwd.path().join(LOCAL_FILE_NAME), "dump: { limit: 2 }\n").unwrap();
        let found = ConfigFile::locate_in(None, cwd.path(), Some(home.path())).unwrap();
        assert_eq!(found, Some(cwd.path().join(LOCAL_FILE_NAME)));
    }

    #[test]
    fn test_locate_without_any_file() {
        let cwd = TempDir::new().unwrap();
        let found = ConfigFile::locate_in(None, cwd.path(), None).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_locate_explicit_path() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("custom.yml");

        assert!(ConfigFile::locate_in(Some(&explicit), dir.path(), None).is_err());

        std::fs::write(&explicit, "dump: { limit: 3 }\n").unwrap();
        let found = ConfigFile::locate_in(Some(&explicit), dir.path(), None).unwrap();
        assert_eq!(found, Some(explicit.clone()));

        let config = ConfigFile::load(&explicit).unwrap();
        assert_eq!(config.dump.limit, Some(3));
    }
}
