use std::{collections::HashMap, fs, path::Path, str::FromStr, time::Duration};

use curation_core::CurationConfig;
use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "curator.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub api_url: String,
    pub cdn_base_url: Option<String>,
    pub cdn_transform: Option<String>,
    pub bearer_token: Option<String>,
    pub page_size: u32,
    pub search_debounce_ms: u64,
    pub success_notice_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        let engine = CurationConfig::default();
        Self {
            api_url: "http://127.0.0.1:8080/api/".into(),
            cdn_base_url: None,
            cdn_transform: None,
            bearer_token: None,
            page_size: engine.page_size,
            search_debounce_ms: engine.search_debounce.as_millis() as u64,
            success_notice_ms: engine.success_notice.as_millis() as u64,
        }
    }
}

impl Settings {
    pub fn curation_config(&self) -> CurationConfig {
        CurationConfig {
            page_size: self.page_size.max(1),
            success_notice: Duration::from_millis(self.success_notice_ms),
            search_debounce: Duration::from_millis(self.search_debounce_ms),
        }
    }

    fn set(&mut self, key: &str, value: String) {
        match key {
            "api_url" => self.api_url = value,
            "cdn_base_url" => self.cdn_base_url = Some(value),
            "cdn_transform" => self.cdn_transform = Some(value),
            "bearer_token" => self.bearer_token = Some(value),
            "page_size" => parse_into(&mut self.page_size, key, &value),
            "search_debounce_ms" => parse_into(&mut self.search_debounce_ms, key, &value),
            "success_notice_ms" => parse_into(&mut self.success_notice_ms, key, &value),
            _ => warn!(key, "ignoring unknown setting"),
        }
    }

    fn apply_file(&mut self, raw: &str) {
        let file_cfg = match toml::from_str::<HashMap<String, toml::Value>>(raw) {
            Ok(file_cfg) => file_cfg,
            Err(err) => {
                warn!(error = %err, "ignoring unreadable config file");
                return;
            }
        };
        for (key, value) in file_cfg {
            let value = match value {
                toml::Value::String(text) => text,
                other => other.to_string(),
            };
            self.set(&key, value);
        }
    }

    /// `CURATOR_<KEY>` and then `APP__<KEY>`, so the latter wins when both are set.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in KEYS {
            let upper = key.to_ascii_uppercase();
            for name in [format!("CURATOR_{upper}"), format!("APP__{upper}")] {
                if let Some(value) = lookup(&name) {
                    self.set(key, value);
                }
            }
        }
    }
}

const KEYS: [&str; 7] = [
    "api_url",
    "cdn_base_url",
    "cdn_transform",
    "bearer_token",
    "page_size",
    "search_debounce_ms",
    "success_notice_ms",
];

fn parse_into<T: FromStr>(target: &mut T, key: &str, value: &str) {
    match value.trim().parse() {
        Ok(parsed) => *target = parsed,
        Err(_) => warn!(key, value, "ignoring non-numeric setting"),
    }
}

pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        settings.apply_file(&raw);
    }
    settings.apply_env(|name| std::env::var(name).ok());

    settings
}
