use std::{collections::BTreeMap, io, path::PathBuf};

use bas_balance_core::{ListQuery, SortDirection, DEFAULT_TABLE};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use thiserror::Error;

use crate::render::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "bas-balance", version, about = "List bas transactions from the balance store")]
pub struct CliArgs {
    /// Path to config file
    #[arg(short, long, default_value = "bas-balance.toml")]
    pub config: PathBuf,

    /// Store backend (overrides config file)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Connection URL, or database path for sqlite (overrides config file)
    #[arg(long, env = "BAS_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Table to list (overrides config file)
    #[arg(long)]
    pub table: Option<String>,

    /// Only list rows where COLUMN equals VALUE; repeatable
    #[arg(long = "filter", value_name = "COLUMN=VALUE")]
    pub filters: Vec<String>,

    /// Sort by COLUMN, ascending unless suffixed with :desc; repeatable
    #[arg(long = "order-by", value_name = "COLUMN[:asc|:desc]")]
    pub order_by: Vec<String>,

    /// Maximum number of rows (overrides config file)
    #[arg(long)]
    pub limit: Option<u64>,

    /// Output format (overrides config file)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Log level (overrides config file)
    #[arg(short, long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid filter {0:?}, expected COLUMN=VALUE")]
    InvalidFilter(String),
    #[error("invalid order {0:?}, expected COLUMN, COLUMN:asc or COLUMN:desc")]
    InvalidOrderBy(String),
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Postgres,
    Sqlite,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: Backend,

    #[serde(default = "default_url")]
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default)]
    pub filters: BTreeMap<String, String>,

    #[serde(default)]
    pub order_by: Vec<String>,

    #[serde(default)]
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json: bool,
}

fn default_url() -> String {
    "postgres://localhost/bas".to_string()
}

fn default_table() -> String {
    DEFAULT_TABLE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: Backend::default(),
            url: default_url(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            table: default_table(),
            filters: BTreeMap::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Reads the config file, falling back to defaults when it does not
    /// exist, then applies command line overrides.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = match std::fs::read_to_string(&cli.config) {
            Ok(contents) => Self::parse(&contents).map_err(|source| ConfigError::Parse {
                path: cli.config.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Config::default(),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: cli.config.clone(),
                    source,
                })
            }
        };

        // CLI overrides
        if let Some(backend) = cli.backend {
            config.store.backend = backend;
        }
        if let Some(ref url) = cli.database_url {
            config.store.url = url.clone();
        }
        if let Some(ref table) = cli.table {
            config.query.table = table.clone();
        }
        for raw in &cli.filters {
            let (column, value) = raw
                .split_once('=')
                .filter(|(column, _)| !column.is_empty())
                .ok_or_else(|| ConfigError::InvalidFilter(raw.clone()))?;
            config.query.filters.insert(column.to_string(), value.to_string());
        }
        if !cli.order_by.is_empty() {
            config.query.order_by = cli.order_by.clone();
        }
        if let Some(limit) = cli.limit {
            config.query.limit = Some(limit);
        }
        if let Some(format) = cli.format {
            config.output.format = format;
        }
        if let Some(ref level) = cli.log_level {
            config.logging.level = level.clone();
        }

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// The query the reader issues. Identifier safety is checked by the
    /// store, this only checks the shape of the configured values.
    pub fn list_query(&self) -> Result<ListQuery, ConfigError> {
        let mut query = ListQuery::all(self.query.table.clone());
        for (column, value) in &self.query.filters {
            query = query.filter(column.clone(), value.clone());
        }
        for raw in &self.query.order_by {
            let (column, direction) = match raw.split_once(':') {
                None => (raw.as_str(), SortDirection::Asc),
                Some((column, dir)) => match dir.to_ascii_lowercase().as_str() {
                    "asc" => (column, SortDirection::Asc),
                    "desc" => (column, SortDirection::Desc),
                    _ => return Err(ConfigError::InvalidOrderBy(raw.clone())),
                },
            };
            if column.is_empty() {
                return Err(ConfigError::InvalidOrderBy(raw.clone()));
            }
            query = query.order_by(column, direction);
        }
        if let Some(limit) = self.query.limit {
            query = query.limit(limit);
        }
        Ok(query)
    }
}
