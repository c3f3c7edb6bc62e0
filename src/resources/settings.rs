use bevy::prelude::*;
use std::str::FromStr;
use std::time::Duration;

use crate::resources::constants::{
    DEFAULT_TILE_SIZE, DEFAULT_TILE_URL, DEFAULT_USER_AGENT, MAX_CACHED_TILES, MAX_CONCURRENT_FETCHES,
    MAX_ZOOM_LEVEL, REQUEST_TIMEOUT,
};
use crate::tile_system::{FetcherConfig, UrlTemplate};

pub const URL_TEMPLATE_VAR: &str = "TILECANVAS_URL_TEMPLATE";
pub const MAX_ZOOM_VAR: &str = "TILECANVAS_MAX_ZOOM";
pub const CACHE_CAPACITY_VAR: &str = "TILECANVAS_CACHE_CAPACITY";
pub const MAX_FETCHES_VAR: &str = "TILECANVAS_MAX_FETCHES";

/// Where tiles come from and how many of them we keep around
#[derive(Resource, Debug, Clone)]
pub struct MapSettings {
    pub url_template: UrlTemplate,
    pub tile_size: u32,
    pub max_zoom: u8,
    pub cache_capacity: usize,
    pub max_concurrent_fetches: usize,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            url_template: UrlTemplate::parse(DEFAULT_TILE_URL)
                .unwrap_or_else(|e| panic!("built-in tile url is invalid: {e}")),
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom: MAX_ZOOM_LEVEL,
            cache_capacity: MAX_CACHED_TILES,
            max_concurrent_fetches: MAX_CONCURRENT_FETCHES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl MapSettings {
    /// Defaults overridden by `TILECANVAS_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overridden by whatever `lookup` returns. Values that do not
    /// parse are reported and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(raw) = lookup(URL_TEMPLATE_VAR) {
            match UrlTemplate::parse(raw) {
                Ok(template) => settings.url_template = template,
                Err(e) => warn!("Ignoring {}: {}", URL_TEMPLATE_VAR, e),
            }
        }
        if let Some(max_zoom) = parse_var::<u8>(&lookup, MAX_ZOOM_VAR) {
            if max_zoom <= 30 {
                settings.max_zoom = max_zoom;
            } else {
                warn!("Ignoring {}: zoom {} is out of range", MAX_ZOOM_VAR, max_zoom);
            }
        }
        if let Some(capacity) = parse_var::<usize>(&lookup, CACHE_CAPACITY_VAR) {
            settings.cache_capacity = capacity.max(1);
        }
        if let Some(fetches) = parse_var::<usize>(&lookup, MAX_FETCHES_VAR) {
            settings.max_concurrent_fetches = fetches.max(1);
        }

        settings
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            url_template: self.url_template.clone(),
            max_zoom: self.max_zoom,
            max_concurrent: self.max_concurrent_fetches,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", name, raw, e);
            None
        }
    }
}

/// Resource to control debug output
#[derive(Resource, Debug, Default)]
pub struct DebugSettings {
    pub debug_mode: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = MapSettings::from_lookup(lookup(&[]));
        assert_eq!(settings.url_template.as_str(), DEFAULT_TILE_URL);
        assert_eq!(settings.tile_size, 256);
        assert_eq!(settings.max_zoom, 19);
        assert_eq!(settings.cache_capacity, 1000);
        assert_eq!(settings.max_concurrent_fetches, 8);
        assert_eq!(settings.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let settings = MapSettings::from_lookup(lookup(&[
            (URL_TEMPLATE_VAR, "https://{s}.tiles.example.net/{z}/{x}/{y}.png"),
            (MAX_ZOOM_VAR, "17"),
            (CACHE_CAPACITY_VAR, " 250 "),
            (MAX_FETCHES_VAR, "2"),
        ]));
        assert_eq!(settings.url_template.as_str(), "https://{s}.tiles.example.net/{z}/{x}/{y}.png");
        assert_eq!(settings.max_zoom, 17);
        assert_eq!(settings.cache_capacity, 250);
        assert_eq!(settings.fetcher_config().max_concurrent, 2);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let settings = MapSettings::from_lookup(lookup(&[
            (URL_TEMPLATE_VAR, "https://tiles.example.net/{z}.png"),
            (MAX_ZOOM_VAR, "deep"),
            (CACHE_CAPACITY_VAR, "-4"),
        ]));
        assert_eq!(settings.url_template.as_str(), DEFAULT_TILE_URL);
        assert_eq!(settings.max_zoom, 19);
        assert_eq!(settings.cache_capacity, 1000);
    }
}
