use crate::dataset::ColumnNames;
use crate::error::MatdiffError;
use crate::export::DEFAULT_REPORT_NAME;
use anyhow::{Context, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "MATDIFF_CONFIG";
pub const OUTPUT_ENV_VAR: &str = "MATDIFF_OUTPUT";
pub const LOCAL_CONFIG_FILE: &str = "matdiff.toml";
const GLOBAL_CONFIG_DIR: &str = ".matdiff";
const GLOBAL_CONFIG_FILE: &str = "global.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub columns: ColumnNames,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub output_path: PathBuf,
    /// Fill the quantity cells of the changed sheet after writing
    pub highlight: bool,
    /// Failures are appended here when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_log: Option<PathBuf>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from(DEFAULT_REPORT_NAME),
            highlight: true,
            error_log: None,
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "lowercase")]
pub enum ConfigSource {
    Explicit(PathBuf),
    Local(PathBuf),
    Global(PathBuf),
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Explicit(path) => write!(f, "{} (explicit)", path.display()),
            ConfigSource::Local(path) => write!(f, "{} (local)", path.display()),
            ConfigSource::Global(path) => write!(f, "{} (global)", path.display()),
            ConfigSource::Default => f.write_str("built-in defaults"),
        }
    }
}

/// A configuration together with the file it was read from
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub config: Config,
    pub source: ConfigSource,
}

pub fn get_config() -> Result<Config> {
    Ok(resolve_config(None)?.config)
}

/// Resolve the active configuration.
///
/// Priority order (highest to lowest):
/// 1. `explicit`, or the file named by `MATDIFF_CONFIG`
/// 2. Local config file (matdiff.toml)
/// 3. Saved global config file (~/.matdiff/global.toml)
/// 4. Default configuration
///
/// `MATDIFF_OUTPUT` then overrides the report path.
pub fn resolve_config(explicit: Option<&Path>) -> Result<ResolvedConfig> {
    let explicit = explicit
        .map(Path::to_path_buf)
        .or_else(|| env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    let mut resolved = match explicit {
        // A named file must load
        Some(path) => ResolvedConfig {
            config: get_config_from(&path)?,
            source: ConfigSource::Explicit(path),
        },
        None => resolve_from_files(
            env::current_dir().ok().map(|dir| dir.join(LOCAL_CONFIG_FILE)),
            global_config_path(),
        ),
    };

    apply_env_overrides(&mut resolved.config, |key| env::var(key).ok());
    Ok(resolved)
}

fn resolve_from_files(local: Option<PathBuf>, global: Option<PathBuf>) -> ResolvedConfig {
    let candidates = [
        local.map(ConfigSource::Local),
        global.map(ConfigSource::Global),
    ];

    for source in candidates.into_iter().flatten() {
        let path = match &source {
            ConfigSource::Local(path) | ConfigSource::Global(path) => path,
            _ => continue,
        };
        if !path.exists() {
            continue;
        }
        match get_config_from(path) {
            Ok(config) => {
                debug!("Using configuration from {source}");
                return ResolvedConfig { config, source };
            }
            Err(e) => warn!("Ignoring configuration {}: {e:#}", path.display()),
        }
    }

    ResolvedConfig {
        config: Config::default(),
        source: ConfigSource::Default,
    }
}

/// Read and parse one config file
pub fn get_config_from(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str::<Config>(&content).map_err(|e| {
        MatdiffError::config(format!("Invalid config file {}: {e}", path.display())).into()
    })
}

/// Apply environment overrides through `lookup`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(output) = lookup(OUTPUT_ENV_VAR).filter(|v| !v.trim().is_empty()) {
        config.report.output_path = PathBuf::from(output);
    }
}

pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
}

/// Save `config` as the global config file
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let config_path = global_config_path()
        .unwrap_or_else(|| PathBuf::from(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE));
    write_config_file(&config_path, config, true)?;
    Ok(config_path)
}

/// Write `matdiff.toml` into `dir`
pub fn write_local_config(dir: &Path, config: &Config, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(LOCAL_CONFIG_FILE);
    write_config_file(&config_path, config, force)?;
    Ok(config_path)
}

fn write_config_file(path: &Path, config: &Config, force: bool) -> Result<()> {
    if path.exists() && !force {
        return Err(MatdiffError::config(format!(
            "Config file {} already exists (use --force to overwrite)",
            path.display()
        ))
        .into());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let config_toml = toml::to_string_pretty(config)?;
    fs::write(path, config_toml)?;
    Ok(())
}
