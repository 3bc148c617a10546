use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use serde::{Serialize, Deserialize};
use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::fs::File;

use crate::cluster::ClusterOptions;
use crate::constants::{DEFAULT_MAX_CLUSTER_RADIUS, DEFAULT_PORT, DEFAULT_SPIDERFY_MULTIPLIER};
use crate::i18n;
use crate::utils::{ensure_directory_exists, get_config_path};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub port: u16,
    #[serde(default)]
    pub auto_open_browser: bool,
    pub locale: Option<String>,
    pub max_cluster_radius: f64,
    pub spiderfy_distance_multiplier: f64,
    pub boundary_file: Option<String>,
    pub places_file: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            auto_open_browser: false,
            locale: None,
            max_cluster_radius: DEFAULT_MAX_CLUSTER_RADIUS,
            spiderfy_distance_multiplier: DEFAULT_SPIDERFY_MULTIPLIER,
            boundary_file: None,
            places_file: None,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let mut settings = Settings::default();
        if !config_path.exists() {
            return Ok(settings);
        }

        let file = File::open(config_path).context("Failed to open config file")?;
        let reader = BufReader::new(file);
        let mut config_map = HashMap::new();

        for line in reader.lines() {
            let line = line.context("Failed to read line from config")?;
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), value.trim().trim_matches('"').to_string());
            }
        }

        if let Some(port) = config_map.get("port").and_then(|v| v.parse::<u16>().ok()) {
            settings.port = port;
        }
        if let Some(auto_open) = config_map.get("auto_open_browser").and_then(|v| v.parse::<bool>().ok()) {
            settings.auto_open_browser = auto_open;
        }
        if let Some(locale) = config_map.get("locale") {
            if i18n::is_supported(locale) {
                settings.locale = Some(locale.clone());
            }
        }
        if let Some(radius) = config_map.get("max_cluster_radius").and_then(|v| v.parse::<f64>().ok()) {
            if radius.is_finite() && radius >= 0.0 {
                settings.max_cluster_radius = radius;
            }
        }
        if let Some(multiplier) = config_map
            .get("spiderfy_distance_multiplier")
            .and_then(|v| v.parse::<f64>().ok())
        {
            if multiplier.is_finite() {
                settings.spiderfy_distance_multiplier = multiplier;
            }
        }
        if let Some(path) = config_map.get("boundary_file").filter(|v| !v.is_empty()) {
            settings.boundary_file = Some(path.clone());
        }
        if let Some(path) = config_map.get("places_file").filter(|v| !v.is_empty()) {
            settings.places_file = Some(path.clone());
        }

        Ok(settings)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            ensure_directory_exists(parent).context("Creating config directory")?;
        }

        let mut content = String::new();
        content.push_str("# Krabi Map Configuration File\n");
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("auto_open_browser = {}\n", self.auto_open_browser));
        if let Some(ref locale) = self.locale {
            content.push_str(&format!("locale = {}\n", locale));
        }
        content.push_str(&format!("max_cluster_radius = {}\n", self.max_cluster_radius));
        content.push_str(&format!(
            "spiderfy_distance_multiplier = {}\n",
            self.spiderfy_distance_multiplier
        ));
        if let Some(ref path) = self.boundary_file {
            content.push_str(&format!("boundary_file = \"{}\"\n", path));
        }
        if let Some(ref path) = self.places_file {
            content.push_str(&format!("places_file = \"{}\"\n", path));
        }

        std::fs::write(config_path, content).context("Failed to write to config file")?;
        Ok(())
    }

    /// Stores a supported locale as the preference; anything else is rejected.
    pub fn update_locale(&mut self, locale: &str) -> Result<()> {
        if !i18n::is_supported(locale) {
            anyhow::bail!("Unsupported locale '{}'", locale);
        }
        self.locale = Some(locale.to_string());
        Ok(())
    }

    pub fn cluster_options(&self) -> ClusterOptions {
        ClusterOptions {
            max_cluster_radius: self.max_cluster_radius,
            spiderfy_distance_multiplier: self.spiderfy_distance_multiplier,
        }
    }

    pub fn config_path() -> PathBuf {
        get_config_path()
    }
}
