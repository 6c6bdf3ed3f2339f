use std::{fs, path::Path};

use anyhow::{bail, Context};
use client_core::{ControllerConfig, DEFAULT_ROW_LIMIT};
use serde::Deserialize;
use shared::domain::DOCUMENT_ID_FIELD;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "iub_table.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub row_limit: u32,
    pub default_sort_field: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".into(),
            row_limit: DEFAULT_ROW_LIMIT,
            default_sort_field: DOCUMENT_ID_FIELD.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_base_url: Option<String>,
    row_limit: Option<u32>,
    default_sort_field: Option<String>,
}

impl Settings {
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            limit: self.row_limit,
            default_sort_field: self.default_sort_field.clone(),
        }
    }

    fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file_cfg.api_base_url {
            self.api_base_url = v;
        }
        if let Some(v) = file_cfg.row_limit {
            self.row_limit = v;
        }
        if let Some(v) = file_cfg.default_sort_field {
            self.default_sort_field = v;
        }
        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("IUB_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("APP__API_BASE_URL") {
            self.api_base_url = v;
        }

        if let Some(v) = lookup("APP__ROW_LIMIT") {
            match v.parse::<u32>() {
                Ok(parsed) => self.row_limit = parsed,
                Err(_) => tracing::warn!(value = %v, "ignoring invalid APP__ROW_LIMIT"),
            }
        }

        if let Some(v) = lookup("APP__DEFAULT_SORT_FIELD") {
            self.default_sort_field = v;
        }
    }
}

/// Builds settings from defaults, then the config file, then the environment.
///
/// A missing default config file is fine; an explicitly requested one must exist.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => settings
            .apply_file(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?,
        Err(err) if config_path.is_some() => {
            return Err(err).with_context(|| format!("failed to read {}", path.display()));
        }
        Err(_) => {}
    }

    settings.apply_env(|key| std::env::var(key).ok());
    Ok(settings)
}

pub fn normalize_api_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(Settings::default().api_base_url);
    }

    let url = Url::parse(trimmed).with_context(|| format!("invalid API base URL {trimmed:?}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("API base URL must use http or https, got {}", url.scheme());
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
