//! Runtime configuration.
//!
//! Read from `<config dir>/xenoar/config.json` when present, then overridden by
//! environment variables:
//! - `GEMINI_API_KEY` (or `API_KEY`) - credential for the inference endpoint
//! - `XENOAR_ENDPOINT` - base URL of the inference API
//! - `XENOAR_MODEL` - model name
//! - `XENOAR_DATA_DIR` - directory holding the library database

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::capture::DEFAULT_JPEG_QUALITY;
use crate::reconstruct::{DEFAULT_ENDPOINT, DEFAULT_MAX_MESH_VERTICES, DEFAULT_MODEL};

const APP_NAME: &str = "xenoar";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub endpoint: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// JPEG quality for captured frames (1-100).
    pub jpeg_quality: u8,
    /// Largest mesh accepted from the endpoint, in vertices.
    pub max_mesh_vertices: usize,
    /// Set when `api_key` came from the environment; such keys are never saved.
    #[serde(skip)]
    api_key_from_env: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            data_dir: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            max_mesh_vertices: DEFAULT_MAX_MESH_VERTICES,
            api_key_from_env: false,
        }
    }
}

impl Config {
    /// Load the config file and apply environment overrides.
    /// Falls back to defaults if the file is missing or unreadable.
    pub fn load() -> Self {
        let file = match get_config_path().and_then(|path| Self::from_file(&path)) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                Self::default()
            }
        };
        file.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_json::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply overrides looked up through `var`.
    pub fn with_overrides(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")) {
            self.api_key = Some(key);
            self.api_key_from_env = true;
        }
        if let Some(endpoint) = non_empty("XENOAR_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(model) = non_empty("XENOAR_MODEL") {
            self.model = model;
        }
        if let Some(dir) = non_empty("XENOAR_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
        self
    }

    pub fn save(&self) -> Result<()> {
        let config_path = get_config_path()?;

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        fs::write(&config_path, self.to_file_contents()?).context("Failed to write config file")?;
        Ok(())
    }

    /// The JSON written by [`save`](Self::save). A key taken from the
    /// environment is left out.
    pub fn to_file_contents(&self) -> Result<String> {
        let mut on_disk = self.clone();
        if on_disk.api_key_from_env {
            on_disk.api_key = None;
        }
        serde_json::to_string_pretty(&on_disk).context("Failed to serialize config")
    }
}

pub fn get_config_path() -> Result<PathBuf> {
    let mut path =
        dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    path.push(APP_NAME);
    path.push(CONFIG_FILE);
    Ok(path)
}
