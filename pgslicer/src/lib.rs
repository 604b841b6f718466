//! Command-line interface of pg-slicer.
//!
//! The binary in `main.rs` only wires these pieces together; argument
//! parsing and the layering of command line, environment and configuration
//! file live here so they can be tested.

pub mod output;

use clap::{ArgAction, Parser};
use pgslicer_core::config::{ConfigFile, ConnectionConfig, ConnectionSection, SliceOptions};
use pgslicer_core::{Result, SlicerError};
use std::path::PathBuf;
use std::time::Duration;

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "pg-slicer")]
#[command(about = "Dump a referentially consistent sample of a PostgreSQL database")]
#[command(version)]
#[command(disable_help_flag = true)]
#[command(long_about = "
pg-slicer writes a loadable SQL dump containing the schema of a PostgreSQL
database and a bounded sample of each table. Rows of a table are only
sampled when their mandatory foreign keys point at rows already sampled
from the parent table, so the dump restores without violations.

The dump is written to stdout unless --output is given. Logs go to stderr.

CONFIGURATION:
  --config PATH, ./pg-slicer.yml or ~/.pg-slicer.yml (first found).
  Command-line and environment values win over the file.

EXAMPLES:
  pg-slicer -h localhost -U reader shop > shop-sample.sql
  pg-slicer -l 20 --dump-full countries --table-limit orders=500 shop
  pg-slicer --table-condition \"users=active AND NOT deleted\" shop
")]
pub struct Cli {
    /// Database server host
    #[arg(short = 'h', long, env = "PGHOST")]
    pub host: Option<String>,

    /// Database server port
    #[arg(short, long, env = "PGPORT")]
    pub port: Option<u16>,

    /// Database user name
    #[arg(short = 'U', long, env = "PGUSER")]
    pub user: Option<String>,

    /// Database password
    #[arg(short = 'W', long, env = "PGPASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Prompt for the password on the terminal, overriding -W and PGPASSWORD
    #[arg(long)]
    pub password_prompt: bool,

    /// Database to sample
    #[arg(value_name = "DBNAME", env = "PGDATABASE")]
    pub dbname: Option<String>,

    /// Rows sampled per table
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Dump TABLE without a row limit (repeatable)
    #[arg(long = "dump-full", value_name = "TABLE")]
    pub dump_full: Vec<String>,

    /// Row limit for one table, as TABLE=N (repeatable)
    #[arg(long = "table-limit", value_name = "TABLE=N", value_parser = parse_table_limit)]
    pub table_limits: Vec<(String, usize)>,

    /// SQL condition for one table, as TABLE=EXPR (repeatable)
    #[arg(long = "table-condition", value_name = "TABLE=EXPR", value_parser = parse_table_condition)]
    pub table_conditions: Vec<(String, String)>,

    /// Append foreign-key constraints after the data
    #[arg(long)]
    pub with_foreign_keys: bool,

    /// Configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the dump to PATH instead of stdout
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Server-side statement timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub statement_timeout: Option<u64>,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

fn split_assignment(value: &str) -> std::result::Result<(&str, &str), String> {
    let (table, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected TABLE=VALUE, got '{}'", value))?;
    let table = table.trim();
    if table.is_empty() {
        return Err(format!("missing table name in '{}'", value));
    }
    Ok((table, rest))
}

fn parse_table_limit(value: &str) -> std::result::Result<(String, usize), String> {
    let (table, limit) = split_assignment(value)?;
    let limit = limit
        .trim()
        .parse::<usize>()
        .map_err(|e| format!("invalid limit for '{}': {}", table, e))?;
    Ok((table.to_string(), limit))
}

fn parse_table_condition(value: &str) -> std::result::Result<(String, String), String> {
    let (table, condition) = split_assignment(value)?;
    Ok((table.to_string(), condition.to_string()))
}

impl Cli {
    /// Connection values given on the command line or through `PG*`
    /// variables.
    pub fn connection_section(&self) -> ConnectionSection {
        ConnectionSection {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.dbname.clone(),
        }
    }

    /// Layers the command-line sampling flags over `base`.
    pub fn apply_to(&self, base: SliceOptions) -> SliceOptions {
        let mut options = base.with_foreign_keys(self.with_foreign_keys);
        if let Some(limit) = self.limit {
            options = options.with_limit(limit);
        }
        for table in &self.dump_full {
            options = options.with_dump_full(table);
        }
        for (table, limit) in &self.table_limits {
            options = options.with_table_limit(table, *limit);
        }
        for (table, condition) in &self.table_conditions {
            options = options.with_table_condition(table, condition);
        }
        options
    }
}

/// Everything a run needs, resolved from all sources.
#[derive(Debug)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub options: SliceOptions,
}

/// Merges the command line (and environment) with the configuration file.
///
/// # Errors
/// Returns a configuration error when no database name is known or the
/// merged values are invalid.
pub fn resolve(cli: &Cli, file: ConfigFile) -> Result<Settings> {
    let options = cli.apply_to(file.slice_options());
    options.validate()?;

    let ConfigFile {
        connection: file_connection,
        ..
    } = file;
    let mut connection = cli.connection_section().or(file_connection).into_config()?;
    if let Some(seconds) = cli.statement_timeout {
        connection = connection.with_statement_timeout(Duration::from_secs(seconds));
    }
    connection.validate()?;

    Ok(Settings {
        connection,
        options,
    })
}

/// Reads the password from the terminal.
///
/// # Errors
/// Returns a configuration error when the terminal cannot be read.
pub fn prompt_password(connection: &ConnectionConfig) -> Result<String> {
    rpassword::prompt_password(format!("Password for {}: ", connection)).map_err(|e| {
        SlicerError::configuration(format!("Failed to read password: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PG_VARS: [&str; 5] = ["PGHOST", "PGPORT", "PGUSER", "PGPASSWORD", "PGDATABASE"];

    fn parse(args: &[&str]) -> Cli {
        temp_env::with_vars_unset(PG_VARS, || {
            Cli::try_parse_from(std::iter::once("pg-slicer").chain(args.iter().copied()))
                .unwrap()
        })
    }

    #[test]
    fn test_short_h_is_host() {
        let cli = parse(&["-h", "db.internal", "-p", "6543", "-U", "reader", "shop"]);
        assert_eq!(cli.host.as_deref(), Some("db.internal"));
        assert_eq!(cli.port, Some(6543));
        assert_eq!(cli.user.as_deref(), Some("reader"));
        assert_eq!(cli.dbname.as_deref(), Some("shop"));
    }

    #[test]
    fn test_sampling_flags() {
        let cli = parse(&[
            "-l",
            "20",
            "--dump-full",
            "countries",
            "--dump-full",
            "currencies",
            "--table-limit",
            "orders=5",
            "--table-condition",
            "users=active = true",
            "--with-foreign-keys",
            "shop",
        ]);

        let options = cli.apply_to(SliceOptions::new());
        assert_eq!(options.limit, 20);
        assert!(options.is_dump_full("countries"));
        assert!(options.is_dump_full("currencies"));
        assert_eq!(options.limit_for("orders"), Some(5));
        assert_eq!(options.condition_for("users"), Some("active = true"));
        assert!(options.emit_foreign_keys);
    }

    #[test]
    fn test_invalid_table_limit_is_rejected() {
        temp_env::with_vars_unset(PG_VARS, || {
            assert!(Cli::try_parse_from(["pg-slicer", "--table-limit", "orders", "shop"]).is_err());
            assert!(
                Cli::try_parse_from(["pg-slicer", "--table-limit", "orders=x", "shop"]).is_err()
            );
            assert!(Cli::try_parse_from(["pg-slicer", "--table-limit", "=5", "shop"]).is_err());
        });
    }

    #[test]
    fn test_password_prompt_with_pgpassword_set() {
        temp_env::with_vars(
            [
                ("PGHOST", None),
                ("PGPORT", None),
                ("PGUSER", None),
                ("PGPASSWORD", Some("env-secret")),
                ("PGDATABASE", None),
            ],
            || {
                let cli = Cli::try_parse_from(["pg-slicer", "--password-prompt", "shop"]).unwrap();
                assert!(cli.password_prompt);
                assert_eq!(cli.password.as_deref(), Some("env-secret"));
            },
        );
    }

    #[test]
    fn test_password_prompt_with_explicit_password() {
        let cli = parse(&["-W", "secret", "--password-prompt", "shop"]);

        assert!(cli.password_prompt);
        assert_eq!(cli.password.as_deref(), Some("secret"));
    }

    #[test]
    fn test_environment_defaults() {
        temp_env::with_vars(
            [
                ("PGHOST", Some("env-host")),
                ("PGPORT", Some("5433")),
                ("PGUSER", Some("env-user")),
                ("PGPASSWORD", Some("env-secret")),
                ("PGDATABASE", Some("env-db")),
            ],
            || {
                let cli = Cli::try_parse_from(["pg-slicer"]).unwrap();
                let settings = resolve(&cli, ConfigFile::default()).unwrap();
                assert_eq!(settings.connection.host, "env-host");
                assert_eq!(settings.connection.port, 5433);
                assert_eq!(settings.connection.database, "env-db");
                assert_eq!(settings.connection.credentials.username(), "env-user");
                assert!(settings.connection.credentials.has_password());
            },
        );
    }

    #[test]
    fn test_command_line_wins_over_environment() {
        temp_env::with_vars([("PGHOST", Some("env-host"))], || {
            let cli = Cli::try_parse_from(["pg-slicer", "-h", "cli-host", "shop"]).unwrap();
            assert_eq!(cli.host.as_deref(), Some("cli-host"));
        });
    }

    #[test]
    fn test_resolve_layers_file_under_command_line() {
        let file = ConfigFile::parse(
            r#"
connection:
  host: file-host
  user: file-user
  database: file-db
dump:
  limit: 50
  tables:
    orders: { limit: 10 }
    countries: { limit: "*" }
"#,
            "test",
        )
        .unwrap();
        let cli = parse(&["-h", "cli-host", "--table-limit", "countries=3", "shop"]);

        let settings = resolve(&cli, file).unwrap();
        assert_eq!(settings.connection.host, "cli-host");
        assert_eq!(settings.connection.credentials.username(), "file-user");
        assert_eq!(settings.connection.database, "shop");
        assert_eq!(settings.options.limit, 50);
        assert_eq!(settings.options.limit_for("orders"), Some(10));
        assert_eq!(settings.options.limit_for("countries"), Some(3));
    }

    #[test]
    fn test_resolve_default_limit() {
        let cli = parse(&["shop"]);
        let settings = resolve(&cli, ConfigFile::default()).unwrap();
        assert_eq!(settings.options.limit, 100);
        assert!(!settings.options.emit_foreign_keys);
        assert_eq!(settings.connection.host, "localhost");
        assert_eq!(settings.connection.port, 5432);
    }

    #[test]
    fn test_resolve_requires_database() {
        let cli = parse(&[]);
        let err = resolve(&cli, ConfigFile::default()).unwrap_err();
        assert!(matches!(err, SlicerError::Configuration { .. }));
    }

    #[test]
    fn test_resolve_rejects_zero_limit() {
        let cli = parse(&["-l", "0", "shop"]);
        assert!(resolve(&cli, ConfigFile::default()).is_err());
    }

    #[test]
    fn test_statement_timeout() {
        let cli = parse(&["--statement-timeout", "30", "shop"]);
        let settings = resolve(&cli, ConfigFile::default()).unwrap();
        assert_eq!(
            settings.connection.statement_timeout,
            Some(Duration::from_secs(30))
        );
    }
}
