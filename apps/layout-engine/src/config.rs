use std::fmt::Display;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

use crate::layout::controller::CompressionConfig;
use crate::layout::page_counter::DEFAULT_BYTES_PER_PAGE;
use crate::layout::style::{PageSize, StyleFloors};

/// Engine configuration loaded from environment variables.
/// Every variable is optional; a set but malformed value is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rust_log: String,
    pub page_size: PageSize,
    pub max_pages: usize,
    pub max_attempts: usize,
    pub max_stages: usize,
    pub min_font_size_pt: f32,
    pub min_margin_in: f32,
    pub min_line_spacing: f32,
    pub estimate_bytes_per_page: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup (the process environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let floors = StyleFloors::default();
        let config = Config {
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            page_size: parse_or(&lookup, "LAYOUT_PAGE_SIZE", PageSize::Letter)?,
            max_pages: parse_or(&lookup, "LAYOUT_MAX_PAGES", 2)?,
            max_attempts: parse_or(&lookup, "LAYOUT_MAX_ATTEMPTS", 16)?,
            max_stages: parse_or(&lookup, "LAYOUT_MAX_STAGES", 5)?,
            min_font_size_pt: parse_or(&lookup, "LAYOUT_MIN_FONT_SIZE", floors.font_size_pt)?,
            min_margin_in: parse_or(&lookup, "LAYOUT_MIN_MARGIN_IN", floors.margin_in)?,
            min_line_spacing: parse_or(&lookup, "LAYOUT_MIN_LINE_SPACING", floors.line_spacing)?,
            estimate_bytes_per_page: parse_or(
                &lookup,
                "LAYOUT_ESTIMATE_BYTES_PER_PAGE",
                DEFAULT_BYTES_PER_PAGE,
            )?,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(anyhow!("LAYOUT_MAX_PAGES must be at least 1"));
        }
        if self.max_attempts == 0 {
            return Err(anyhow!("LAYOUT_MAX_ATTEMPTS must be at least 1"));
        }
        if self.estimate_bytes_per_page == 0 {
            return Err(anyhow!("LAYOUT_ESTIMATE_BYTES_PER_PAGE must be at least 1"));
        }
        if !(self.min_font_size_pt > 0.0 && self.min_margin_in >= 0.0 && self.min_line_spacing > 0.0)
        {
            return Err(anyhow!(
                "style floors must be positive (font {}, margin {}, line spacing {})",
                self.min_font_size_pt,
                self.min_margin_in,
                self.min_line_spacing
            ));
        }
        Ok(())
    }

    /// Controller settings. Defaults below a configured floor start at the floor.
    pub fn compression(&self) -> CompressionConfig {
        let floors = StyleFloors {
            font_size_pt: self.min_font_size_pt,
            margin_in: self.min_margin_in,
            line_spacing: self.min_line_spacing,
        };
        let base = CompressionConfig::default();
        CompressionConfig {
            max_attempts: self.max_attempts,
            max_stages: self.max_stages,
            defaults: base.defaults.clamped_to(&floors),
            floors,
            estimate_bytes_per_page: self.estimate_bytes_per_page,
            ..base
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("{e}"))
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.rust_log, "info");
        assert_eq!(config.page_size, PageSize::Letter);
        assert_eq!(config.max_pages, 2);
        assert_eq!(config.compression(), CompressionConfig::default());
    }

    #[test]
    fn test_values_are_parsed() {
        let config = config_from(&[
            ("LAYOUT_PAGE_SIZE", "A4"),
            ("LAYOUT_MAX_PAGES", "1"),
            ("LAYOUT_MAX_ATTEMPTS", "8"),
            ("LAYOUT_MIN_FONT_SIZE", "8.5"),
        ])
        .unwrap();
        assert_eq!(config.page_size, PageSize::A4);
        assert_eq!(config.max_pages, 1);
        let compression = config.compression();
        assert_eq!(compression.max_attempts, 8);
        assert_eq!(compression.floors.font_size_pt, 8.5);
    }

    #[test]
    fn test_malformed_value_is_error_with_key() {
        let err = config_from(&[("LAYOUT_MAX_PAGES", "two")]).unwrap_err();
        assert!(format!("{err:#}").contains("LAYOUT_MAX_PAGES"));
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        assert!(config_from(&[("LAYOUT_MAX_PAGES", "0")]).is_err());
    }

    #[test]
    fn test_floor_above_default_raises_default() {
        let config = config_from(&[("LAYOUT_MIN_MARGIN_IN", "1.0")]).unwrap();
        let compression = config.compression();
        assert_eq!(compression.defaults.margin_in, 1.0);
        assert_eq!(compression.defaults.font_size_pt, 10.0);
    }
}
