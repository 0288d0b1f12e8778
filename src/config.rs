use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Pool size shared by the CLI command or the server.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits on a locked database before failing.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_max_connections() -> u32 {
    5
}
fn default_busy_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Records per result page.
    #[serde(default = "default_page_size")]
    pub page_size: i64,
    /// Excerpt length shown with each result.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            excerpt_chars: default_excerpt_chars(),
        }
    }
}

fn default_page_size() -> i64 {
    10
}
fn default_excerpt_chars() -> usize {
    150
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ContentConfig {
    /// JSON export of the host's content store.
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}

impl Config {
    /// Content snapshot path, or an error naming the missing setting.
    pub fn snapshot_path(&self) -> Result<&Path> {
        self.content
            .snapshot
            .as_deref()
            .context("content.snapshot must be set for this command")
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.max_connections == 0 {
        anyhow::bail!("db.max_connections must be >= 1");
    }
    if config.search.page_size < 1 {
        anyhow::bail!("search.page_size must be >= 1");
    }
    if config.search.excerpt_chars == 0 {
        anyhow::bail!("search.excerpt_chars must be > 0");
    }
    Ok(())
}
