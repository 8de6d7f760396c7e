mod session;
mod settings;

pub use session::{clear_session, load_session, save_session};
pub use settings::{Currency, Settings};

use crate::error::{InvoiceError, Result};
use directories::ProjectDirs;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const URL_ENV: &str = "INVOICETREE_URL";
pub const ANON_KEY_ENV: &str = "INVOICETREE_ANON_KEY";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub pdf: PdfSettings,
}

/// Where the hosted backend lives and the public key every request carries.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct PdfSettings {
    pub output_dir: String,
}

impl Config {
    /// Environment variables win over the file so a checkout can point at a
    /// different project without editing config.toml.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(URL_ENV) {
            self.backend.url = url;
        }
        if let Ok(key) = std::env::var(ANON_KEY_ENV) {
            self.backend.anon_key = key;
        }
    }

    pub fn backend(&self) -> Result<&BackendConfig> {
        if self.backend.url.trim().is_empty() {
            return Err(InvoiceError::BackendNotConfigured);
        }
        Ok(&self.backend)
    }
}

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "invoicetree") {
        return Ok(proj_dirs.config_dir().to_path_buf());
    }

    // Fallback to ~/.invoicetree/
    let home = dirs_home().ok_or_else(|| {
        InvoiceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Could not determine home directory",
        ))
    })?;

    Ok(home.join(".invoicetree"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

/// Expand ~ in paths
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_home() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Relative output dirs are taken relative to the config directory.
pub fn resolve_output_dir(output_dir: &str, cfg_dir: &Path) -> PathBuf {
    let path = expand_path(output_dir);
    if path.is_absolute() {
        path
    } else {
        cfg_dir.join(path)
    }
}

pub(crate) fn read_toml<T: DeserializeOwned>(path: PathBuf) -> Result<T> {
    let content = fs::read_to_string(&path)?;
    toml::from_str(&content).map_err(|e| InvoiceError::ConfigParse { path, source: e })
}

pub(crate) fn write_toml<T: Serialize>(path: PathBuf, value: &T) -> Result<()> {
    let content = toml::to_string_pretty(value)
        .map_err(|e| InvoiceError::ConfigWrite { path: path.clone(), source: e })?;
    fs::write(path, content)?;
    Ok(())
}

/// Load the main config.toml
pub fn load_config(config_dir: &Path) -> Result<Config> {
    if !config_dir.exists() {
        return Err(InvoiceError::ConfigNotFound(config_dir.to_path_buf()));
    }
    let path = config_dir.join("config.toml");
    if !path.exists() {
        return Err(InvoiceError::ConfigFileNotFound(path));
    }
    let mut config: Config = read_toml(path)?;
    config.apply_env();
    Ok(config)
}

/// Template content for config.toml
pub const CONFIG_TEMPLATE: &str = r#"[backend]
# Project URL and public (anon) key of the hosted backend.
# INVOICETREE_URL / INVOICETREE_ANON_KEY override these.
url = ""
anon_key = ""

[pdf]
output_dir = "output"
"#;

/// Template content for settings.toml
pub const SETTINGS_TEMPLATE: &str = r#"# Local preferences. These never leave this machine.
default_currency = "USD"           # USD, EUR, GBP or COP
default_payment_terms = "Net 30"
default_notes = ""
default_terms = ""
email_notifications = true
number_format = "INV-{year}-{seq:04}"
due_days = 30
"#;
