//! qbackup command line entry point.
//!
//! # Responsibility
//! - Resolve settings from flags over `QBACKUP_*` environment variables.
//! - Open the selected backend for exactly one command, then release it.
//! - Report failures as one stderr line and a non-zero exit code.

mod commands;

use clap::Parser;
use commands::{Command, Stores};
use log::{error, info};
use qbackup_core::db::BOOTSTRAP_SQL;
use qbackup_core::table::TableError;
use qbackup_core::{
    init_logging, scoped, Backend, ConfigError, ConnectorError, DirLockConnector,
    DocumentManager, Group, ManagerError, MemoryConnector, MemoryManager, Period, Qube,
    SqliteConnector, SqliteManager, StoreConfig,
};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const PERIODS: &str = "periods";
const GROUPS: &str = "groups";
const QUBES: &str = "qubes";

#[derive(Debug, Parser)]
#[command(name = "qbackup", version, about = "Manage qbackup periods, groups and qubes")]
struct Cli {
    /// Data directory (overrides QBACKUP_HOME).
    #[arg(long, global = true, value_name = "DIR")]
    home: Option<PathBuf>,
    /// Storage backend: document, sqlite or memory (overrides QBACKUP_BACKEND).
    #[arg(long, global = true, value_name = "BACKEND")]
    backend: Option<Backend>,
    /// Log level (overrides QBACKUP_LOG_LEVEL).
    #[arg(long, global = true, value_name = "LEVEL")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(String),
    Connector(ConnectorError),
    Manager(ManagerError),
    Table(TableError),
    Io(io::Error),
    /// A referenced record does not exist.
    Missing { kind: &'static str, name: String },
    /// A record is still referenced and cannot be removed.
    InUse {
        kind: &'static str,
        name: String,
        user: String,
    },
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "logging: {message}"),
            Self::Connector(err) => write!(f, "{err}"),
            Self::Manager(err) => write!(f, "{err}"),
            Self::Table(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Missing { kind, name } => write!(f, "{kind} `{name}` does not exist"),
            Self::InUse { kind, name, user } => {
                write!(f, "{kind} `{name}` is still used by {user}")
            }
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Connector(err) => Some(err),
            Self::Manager(err) => Some(err),
            Self::Table(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Logging(_) | Self::Missing { .. } | Self::InUse { .. } => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<ConnectorError> for CliError {
    fn from(value: ConnectorError) -> Self {
        Self::Connector(value)
    }
}

impl From<ManagerError> for CliError {
    fn from(value: ManagerError) -> Self {
        Self::Manager(value)
    }
}

impl From<TableError> for CliError {
    fn from(value: TableError) -> Self {
        Self::Table(value)
    }
}

impl From<io::Error> for CliError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("qbackup: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = resolve_config(&cli, StoreConfig::from_env()?);
    if config.log_enabled {
        let log_dir = absolute(&config.log_dir())?;
        init_logging(&config.log_level, &log_dir).map_err(CliError::Logging)?;
    }
    info!(
        "event=cli_command module=cli status=start backend={} home={}",
        config.backend,
        config.home.display()
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    dispatch(&config, cli.command, &mut out)?;
    out.flush()?;

    info!("event=cli_command module=cli status=ok");
    Ok(())
}

/// Applies command-line overrides on top of the environment settings.
fn resolve_config(cli: &Cli, mut config: StoreConfig) -> StoreConfig {
    if let Some(home) = &cli.home {
        config.home = home.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    config
}

fn dispatch<W: Write>(config: &StoreConfig, command: Command, out: &mut W) -> Result<(), CliError> {
    match config.backend {
        Backend::Document => {
            let mut connector = DirLockConnector::new(&config.home);
            scoped(&mut connector, |connector| {
                let connector = &*connector;
                Stores {
                    periods: DocumentManager::<Period>::open(PERIODS, connector)?,
                    groups: DocumentManager::<Group>::open(GROUPS, connector)?,
                    qubes: DocumentManager::<Qube>::open(QUBES, connector)?,
                }
                .execute(command, out)
            })
        }
        Backend::Sqlite => {
            std::fs::create_dir_all(&config.home)?;
            let mut connector =
                SqliteConnector::new(config.database_path()).with_bootstrap(BOOTSTRAP_SQL);
            scoped(&mut connector, |connector| {
                let connector = &*connector;
                Stores {
                    periods: SqliteManager::<Period>::new(PERIODS, connector)?,
                    groups: SqliteManager::<Group>::new(GROUPS, connector)?,
                    qubes: SqliteManager::<Qube>::new(QUBES, connector)?,
                }
                .execute(command, out)
            })
        }
        Backend::Memory => {
            let mut connector = MemoryConnector::new();
            scoped(&mut connector, |connector| {
                let connector = &*connector;
                Stores {
                    periods: MemoryManager::<Period>::new(PERIODS, connector)?,
                    groups: MemoryManager::<Group>::new(GROUPS, connector)?,
                    qubes: MemoryManager::<Qube>::new(QUBES, connector)?,
                }
                .execute(command, out)
            })
        }
    }
}

fn absolute(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
