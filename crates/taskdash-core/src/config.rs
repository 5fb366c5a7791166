use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, anyhow};
use tracing::{debug, info, trace, warn};

const DEFAULTS: &[(&str, &str)] = &[
    ("data.location", "~/.taskdash"),
    ("store.latency_ms", "800"),
    ("auth.latency_ms", "1000"),
    ("dashboard.search_debounce_ms", "500"),
    ("dashboard.fetch_timeout_ms", "5000"),
    ("dashboard.page_size", "10"),
    ("color", "on"),
    ("site.url", "https://yourdomain.com"),
    ("site.name", "Task Manager"),
];

#[derive(Debug, Clone)]
pub struct Config {
    map: HashMap<String, String>,
    pub loaded_files: Vec<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            map: DEFAULTS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            loaded_files: vec![],
        }
    }
}

impl Config {
    #[tracing::instrument(skip(config_override))]
    pub fn load(config_override: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = Config::default();

        match resolve_config_path(config_override)? {
            Some(path) => {
                info!(config = %path.display(), "loading config file");
                cfg.load_file(&path)?;
            }
            None => warn!("no config file found; using defaults"),
        }

        Ok(cfg)
    }

    #[tracing::instrument(skip(self, overrides))]
    pub fn apply_overrides<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in overrides {
            let key = k.strip_prefix("rc.").unwrap_or(&k).to_string();
            debug!(key = %key, value = %v, "applying override");
            self.map.insert(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> anyhow::Result<Option<bool>> {
        self.map
            .get(key)
            .map(|raw| {
                parse_bool(raw)
                    .ok_or_else(|| anyhow!("config key {key} expects on/off, got {raw:?}"))
            })
            .transpose()
    }

    pub fn get_u64(&self, key: &str) -> anyhow::Result<Option<u64>> {
        self.map
            .get(key)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .with_context(|| format!("config key {key} expects an integer, got {raw:?}"))
            })
            .transpose()
    }

    /// Reads a millisecond count, falling back to `default` when the key is unset.
    pub fn get_millis(&self, key: &str, default: Duration) -> anyhow::Result<Duration> {
        Ok(self
            .get_u64(key)?
            .map(Duration::from_millis)
            .unwrap_or(default))
    }

    #[tracing::instrument(skip(self))]
    fn load_file(&mut self, path: &Path) -> anyhow::Result<()> {
        let path = expand_tilde(path);
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let table = toml::from_str::<toml::Table>(&text)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        self.loaded_files.push(path.clone());
        self.flatten_into("", &table);
        Ok(())
    }

    fn flatten_into(&mut self, prefix: &str, table: &toml::Table) {
        for (k, v) in table {
            let key = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };

            let value = match v {
                toml::Value::Table(inner) => {
                    self.flatten_into(&key, inner);
                    continue;
                }
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Float(f) => f.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                toml::Value::Datetime(dt) => dt.to_string(),
                toml::Value::Array(_) => {
                    warn!(key = %key, "array config values are not supported; skipping");
                    continue;
                }
            };

            trace!(key = %key, value = %value, "loaded config key");
            self.map.insert(key, value);
        }
    }
}

#[tracing::instrument(skip(cfg, override_dir))]
pub fn resolve_data_dir(cfg: &Config, override_dir: Option<&Path>) -> anyhow::Result<PathBuf> {
    let dir = if let Some(path) = override_dir {
        path.to_path_buf()
    } else if let Some(cfg_value) = cfg.get("data.location") {
        expand_tilde(Path::new(&cfg_value))
    } else {
        default_data_dir()?
    };

    if !dir.exists() {
        info!(dir = %dir.display(), "creating data directory");
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    Ok(dir)
}

#[tracing::instrument(skip(override_path))]
fn resolve_config_path(override_path: Option<&Path>) -> anyhow::Result<Option<PathBuf>> {
    if let Some(path) = override_path {
        return Ok(Some(path.to_path_buf()));
    }

    if let Ok(env_path) = std::env::var("TASKDASH_CONFIG") {
        if env_path == "/dev/null" {
            return Ok(None);
        }
        return Ok(Some(PathBuf::from(env_path)));
    }

    let Some(config_dir) = dirs::config_dir() else {
        return Ok(None);
    };
    let candidate = config_dir.join("taskdash").join("config.toml");
    if candidate.exists() {
        return Ok(Some(candidate));
    }

    Ok(None)
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("cannot determine home directory"))?;
    Ok(home.join(".taskdash"))
}

pub(crate) fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if let Some(rest) = text.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "y" | "yes" | "on" | "true" => Some(true),
        "0" | "n" | "no" | "off" | "false" => Some(false),
        _ => None,
    }
}
