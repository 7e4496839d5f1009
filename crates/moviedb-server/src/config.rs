//! Server configuration: an optional TOML file, then environment overrides.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:3002"
//!
//! [database]
//! url = "${DATABASE_URL}"
//! pool_size = 16
//! query_timeout_ms = 5000
//!
//! [bootstrap]
//! enabled = true
//! seed = true
//! ```

use anyhow::Context;
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file read when neither `--config` nor `MOVIEDB_CONFIG` is given.
pub const DEFAULT_CONFIG_FILE: &str = "moviedb.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3002".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: usize,
    /// Per-statement timeout; unset means no limit.
    pub query_timeout_ms: Option<u64>,
    /// How long a request waits for a pooled connection.
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            pool_size: moviedb::pool::DEFAULT_POOL_SIZE,
            query_timeout_ms: None,
            acquire_timeout_ms: 5_000,
        }
    }
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Option<Duration> {
        self.query_timeout_ms.map(Duration::from_millis)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    /// Create missing tables at startup.
    pub enabled: bool,
    /// Also insert the sample rows.
    pub seed: bool,
}

impl Config {
    /// Load configuration for the process.
    ///
    /// `args` are the command-line arguments (program name first).
    pub fn load(args: &[String]) -> anyhow::Result<Self> {
        let env = |key: &str| std::env::var(key).ok();

        let mut config = match config_path(args, &env)? {
            Some(path) => Self::from_file(&path, &env)?,
            None => Self::default(),
        };
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path, env: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml(&raw, env)
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    fn from_toml(raw: &str, env: &impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut config: Config = toml::from_str(raw)?;
        config.server.bind = expand_env_vars(&config.server.bind, env)?;
        config.database.url = expand_env_vars(&config.database.url, env)?;
        Ok(config)
    }

    fn apply_env(&mut self, env: &impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(url) = env("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(bind) = env("MOVIEDB_BIND") {
            self.server.bind = bind;
        }
        if let Some(v) = env("MOVIEDB_POOL_SIZE") {
            self.database.pool_size = v
                .trim()
                .parse()
                .with_context(|| format!("MOVIEDB_POOL_SIZE is not a number: {v}"))?;
        }
        if let Some(v) = env("MOVIEDB_QUERY_TIMEOUT_MS") {
            let ms: u64 = v
                .trim()
                .parse()
                .with_context(|| format!("MOVIEDB_QUERY_TIMEOUT_MS is not a number: {v}"))?;
            // 0 disables the timeout
            self.database.query_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(v) = env("MOVIEDB_BOOTSTRAP") {
            self.bootstrap.enabled = parse_bool("MOVIEDB_BOOTSTRAP", &v)?;
        }
        if let Some(v) = env("MOVIEDB_SEED") {
            self.bootstrap.seed = parse_bool("MOVIEDB_SEED", &v)?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.url.trim().is_empty() {
            anyhow::bail!("database.url must not be empty (set DATABASE_URL)");
        }
        if self.database.pool_size == 0 {
            anyhow::bail!("database.pool_size must be greater than 0");
        }
        if self.database.acquire_timeout_ms == 0 {
            anyhow::bail!("database.acquire_timeout_ms must be greater than 0");
        }
        if self.bootstrap.seed && !self.bootstrap.enabled {
            anyhow::bail!("bootstrap.seed requires bootstrap.enabled");
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .with_context(|| format!("invalid server.bind address: {}", self.server.bind))
    }
}

/// Resolve the config file: `--config <path>`, then `MOVIEDB_CONFIG`, then
/// `moviedb.toml` if it exists.
fn config_path(
    args: &[String],
    env: &impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Option<PathBuf>> {
    let mut it = args.iter().skip(1);
    while let Some(token) = it.next() {
        match token.as_str() {
            "--config" => {
                let Some(v) = it.next() else {
                    anyhow::bail!("--config requires a value");
                };
                return Ok(Some(PathBuf::from(v)));
            }
            _ if token.starts_with("--config=") => {
                return Ok(Some(PathBuf::from(token.trim_start_matches("--config="))));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
    }

    if let Some(path) = env("MOVIEDB_CONFIG") {
        return Ok(Some(PathBuf::from(path)));
    }

    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    Ok(default.is_file().then_some(default))
}

fn parse_bool(key: &str, raw: &str) -> anyhow::Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{key} must be a boolean, got: {raw}"),
    }
}

/// Replace `${VAR}` references with values from `env`.
fn expand_env_vars(input: &str, env: &impl Fn(&str) -> Option<String>) -> anyhow::Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut key = String::new();
            let mut closed = false;
            for ch in chars.by_ref() {
                if ch == '}' {
                    closed = true;
                    break;
                }
                key.push(ch);
            }

            if !closed {
                anyhow::bail!("unterminated env var reference: ${{{key}}}");
            }
            if key.is_empty() {
                anyhow::bail!("invalid env var reference: ${{}}");
            }

            let v = env(&key)
                .ok_or_else(|| anyhow::anyhow!("missing env var for config expansion: {key}"))?;
            out.push_str(&v);
            continue;
        }

        out.push(c);
    }

    Ok(out)
}
