use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::constants::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_FEED_URL, DEFAULT_MIN_RADIUS, DEFAULT_PORT,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_ZOOM,
};
use crate::utils::{ensure_directory_exists, get_config_path};

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub feed_url: String,
    pub port: u16,
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: u8,
    /// Smallest radius drawn, in meters
    pub min_radius: f64,
    pub request_timeout_secs: u64,
    pub auto_open_browser: bool,
    /// Also write a standalone copy of the page here
    pub export_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_url: DEFAULT_FEED_URL.to_string(),
            port: DEFAULT_PORT,
            center_lat: DEFAULT_CENTER_LAT,
            center_lng: DEFAULT_CENTER_LNG,
            zoom: DEFAULT_ZOOM,
            min_radius: DEFAULT_MIN_RADIUS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            auto_open_browser: false,
            export_path: None,
        }
    }
}

fn set_parsed<T: FromStr>(config_map: &HashMap<String, String>, key: &str, target: &mut T) {
    if let Some(value) = config_map.get(key) {
        match value.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("Ignoring invalid value for {}: {}", key, value),
        }
    }
}

/// Writes a string value in double quotes, escaping backslashes and quotes.
fn quote_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Inverse of `quote_value`. Unquoted values are taken as they are.
fn unquote_value(raw: &str) -> String {
    let inner = match raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
        Some(inner) => inner,
        None => return raw.to_string(),
    };
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                value.push(escaped);
                continue;
            }
        }
        value.push(c);
    }
    value
}

impl Settings {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            tracing::info!("No config at {}, using defaults", config_path.display());
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
        Ok(Self::parse(&content))
    }

    /// Parses `key = value` lines. Unknown keys are ignored and unparseable
    /// values keep their default.
    pub fn parse(content: &str) -> Self {
        let mut settings = Settings::default();
        let mut config_map = HashMap::new();

        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') || line.is_empty() {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                config_map.insert(key.trim().to_string(), unquote_value(value.trim()));
            }
        }

        if let Some(feed_url) = config_map.get("feed_url") {
            if !feed_url.is_empty() {
                settings.feed_url = feed_url.clone();
            }
        }
        set_parsed(&config_map, "port", &mut settings.port);
        set_parsed(&config_map, "center_lat", &mut settings.center_lat);
        set_parsed(&config_map, "center_lng", &mut settings.center_lng);
        set_parsed(&config_map, "zoom", &mut settings.zoom);
        set_parsed(&config_map, "min_radius", &mut settings.min_radius);
        set_parsed(&config_map, "request_timeout_secs", &mut settings.request_timeout_secs);
        set_parsed(&config_map, "auto_open_browser", &mut settings.auto_open_browser);
        if let Some(export_path) = config_map.get("export_path") {
            settings.export_path = Some(export_path.clone()).filter(|p| !p.is_empty());
        }

        settings
    }

    pub fn to_ini(&self) -> String {
        let mut content = String::new();
        content.push_str("# QuakeMap Configuration File\n");
        content.push_str(&format!("feed_url = {}\n", quote_value(&self.feed_url)));
        content.push_str(&format!("port = {}\n", self.port));
        content.push_str(&format!("center_lat = {}\n", self.center_lat));
        content.push_str(&format!("center_lng = {}\n", self.center_lng));
        content.push_str(&format!("zoom = {}\n", self.zoom));
        content.push_str(&format!("min_radius = {}\n", self.min_radius));
        content.push_str(&format!("request_timeout_secs = {}\n", self.request_timeout_secs));
        content.push_str(&format!("auto_open_browser = {}\n", self.auto_open_browser));
        if let Some(ref export_path) = self.export_path {
            content.push_str(&format!("export_path = {}\n", quote_value(export_path)));
        }
        content
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            ensure_directory_exists(parent).context("Creating config directory")?;
        }
        std::fs::write(config_path, self.to_ini()).context("Failed to write to config file")?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        get_config_path()
    }

    pub fn server_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_published_map() {
        let settings = Settings::default();
        assert_eq!(settings.center_lat, 48.10);
        assert_eq!(settings.center_lng, -100.10);
        assert_eq!(settings.zoom, 4);
        assert_eq!(settings.port, 3001);
        assert!(settings.feed_url.ends_with("all_week.geojson"));
    }

    #[test]
    fn test_parse_overrides_and_comments() {
        let settings = Settings::parse(
            "# comment\n\
             feed_url = \"https://example.org/feed.geojson\"\n\
             port = 8080\n\
             zoom = 6\n\
             \n\
             min_radius = 500.5\n\
             auto_open_browser = true\n\
             export_path = \"/tmp/quakes.html\"\n\
             unknown_key = 1\n",
        );
        assert_eq!(settings.feed_url, "https://example.org/feed.geojson");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.zoom, 6);
        assert_eq!(settings.min_radius, 500.5);
        assert!(settings.auto_open_browser);
        assert_eq!(settings.export_path.as_deref(), Some("/tmp/quakes.html"));
        assert_eq!(settings.center_lat, 48.10);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let settings = Settings::parse("port = not-a-port\nzoom = 900\nmin_radius = big\n");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_ini_output_parses_back() {
        let settings = Settings {
            port: 4000,
            center_lat: 35.5,
            export_path: Some("out.html".to_string()),
            ..Default::default()
        };
        assert_eq!(Settings::parse(&settings.to_ini()), settings);
    }

    #[test]
    fn test_quotes_and_backslashes_survive_save() {
        let settings = Settings {
            feed_url: "https://example.org/feed?q=\"deep\"".to_string(),
            export_path: Some("C:\\maps\\\"quakes\".html".to_string()),
            ..Default::default()
        };
        let ini = settings.to_ini();
        assert!(ini.contains(r#"feed_url = "https://example.org/feed?q=\"deep\"""#));
        assert_eq!(Settings::parse(&ini), settings);
    }

    #[test]
    fn test_unquoted_values_are_read_verbatim() {
        let settings = Settings::parse("export_path = out\\quakes.html\n");
        assert_eq!(settings.export_path.as_deref(), Some("out\\quakes.html"));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = std::env::temp_dir().join(format!("quakemap-settings-{}", std::process::id()));
        let path = dir.join("quakemap.ini");
        let settings = Settings {
            zoom: 7,
            ..Default::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("quakemap-does-not-exist/quakemap.ini");
        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }
}
