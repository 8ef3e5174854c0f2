//! # Configuration Module
//!
//! Settings come from environment variables (optionally via a `.env` file)
//! on top of [`Config::default`], and are checked by [`Config::validate`]
//! before anything talks to a model.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Settings for the agents, the search tool and the PDF renderer.
#[derive(Debug, Clone)]
pub struct Config {
    /// The Ollama model to use (e.g., "llama3.2")
    pub model: String,

    /// Ollama server URL
    pub ollama_host: String,

    /// Temperature for LLM responses (0.0 = deterministic, 2.0 = wild)
    pub temperature: f32,

    /// Maximum results kept per web search
    pub max_search_results: usize,

    /// Maximum searches the planner may schedule for one query
    pub max_searches: usize,

    /// Where rendered PDFs are written
    pub pdf_output_dir: PathBuf,

    /// Directory holding the TrueType files of `font_family`
    pub font_dir: PathBuf,

    /// Font family name, e.g. "LiberationSans" for LiberationSans-Regular.ttf
    pub font_family: String,

    /// `tracing` filter directive, e.g. "info" or "warn,interactive_research=debug"
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.7,
            max_search_results: 5,
            max_searches: 5,
            pdf_output_dir: PathBuf::from("pdf_output"),
            font_dir: PathBuf::from("/usr/share/fonts/truetype/liberation"),
            font_family: "LiberationSans".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(val) = lookup("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.7)")?;
        }

        if let Some(val) = lookup("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("MAX_SEARCHES") {
            config.max_searches = val
                .parse()
                .context("MAX_SEARCHES must be a valid positive integer")?;
        }

        if let Some(val) = lookup("PDF_OUTPUT_DIR") {
            config.pdf_output_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("PDF_FONT_DIR") {
            config.font_dir = PathBuf::from(val);
        }

        if let Some(val) = lookup("PDF_FONT_FAMILY") {
            config.font_family = val;
        }

        if let Some(val) = lookup("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Fail fast on values the agents cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_search_results == 0 {
            anyhow::bail!("MAX_SEARCH_RESULTS must be at least 1");
        }

        if !(1..=20).contains(&self.max_searches) {
            anyhow::bail!("MAX_SEARCHES must be between 1 and 20, got: {}", self.max_searches);
        }

        if self.model.is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        if self.ollama_host.is_empty() {
            anyhow::bail!("OLLAMA_API_BASE_URL cannot be empty");
        }

        if self.font_family.is_empty() {
            anyhow::bail!("PDF_FONT_FAMILY cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_vars(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert!((config.temperature - 0.7).abs() < f32::EPSILON);
        assert_eq!(config.max_search_results, 5);
        assert_eq!(config.max_searches, 5);
        assert_eq!(config.pdf_output_dir, PathBuf::from("pdf_output"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides_from_variables() {
        let config = from_vars(&[
            ("OLLAMA_MODEL", "qwen2.5"),
            ("TEMPERATURE", "0.2"),
            ("MAX_SEARCHES", "3"),
            ("PDF_OUTPUT_DIR", "/tmp/reports"),
            ("PDF_FONT_FAMILY", "DejaVuSans"),
        ])
        .unwrap();

        assert_eq!(config.model, "qwen2.5");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.max_searches, 3);
        assert_eq!(config.pdf_output_dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.font_family, "DejaVuSans");
    }

    #[test]
    fn test_unparseable_number_is_an_error() {
        assert!(from_vars(&[("TEMPERATURE", "warm")]).is_err());
        assert!(from_vars(&[("MAX_SEARCHES", "-1")]).is_err());
    }

    #[test]
    fn test_config_validation_invalid_temperature() {
        let mut config = Config::default();
        config.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_search_limits() {
        let mut config = Config::default();
        config.max_search_results = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_searches = 0;
        assert!(config.validate().is_err());

        config.max_searches = 21;
        assert!(config.validate().is_err());
    }
}
