// TOML config adapter - Settings loaded from TOML files and environment overrides

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ShrinkError, ShrinkResult};

/// Config file picked up from the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "vidshrink.toml";

/// Prefix shared by all environment overrides
pub const ENV_PREFIX: &str = "VIDSHRINK_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Complete runtime settings
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub output: OutputSettings,
    pub pipeline: PipelineSettings,
    pub encoder: EncoderSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    /// Directory for generated output names; defaults to the source's directory
    pub directory: Option<PathBuf>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    /// Frames buffered between the decode and encode stages
    pub channel_capacity: usize,
    /// Minimum progress increase between two reports
    pub progress_step: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderSettings {
    pub codec: String,
    pub preset: String,
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: None,
            overwrite: true,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            progress_step: 0.01,
        }
    }
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            preset: "medium".to_string(),
            threads: num_cpus::get(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// TOML configuration adapter
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Parse settings from TOML text; missing keys keep their defaults
    pub fn parse(content: &str) -> ShrinkResult<Settings> {
        toml::from_str(content)
            .map_err(|e| ShrinkError::config(format!("failed to parse TOML config: {}", e)))
    }

    /// Load settings from a file
    pub fn load_file(path: &Path) -> ShrinkResult<Settings> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ShrinkError::config(format!("failed to read {}: {}", path.display(), e))
        })?;
        let settings = Self::parse(&content)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(settings)
    }

    /// Load an explicit file, or `vidshrink.toml` if present, or defaults
    pub fn load(explicit: Option<&Path>) -> ShrinkResult<Settings> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.is_file() {
                    Self::load_file(fallback)
                } else {
                    debug!("No configuration file found, using defaults");
                    Ok(Settings::default())
                }
            }
        }
    }

    /// Apply `VIDSHRINK_*` overrides from the process environment
    pub fn apply_env(settings: &mut Settings) -> ShrinkResult<usize> {
        Self::apply_overrides(settings, |key| std::env::var(key).ok())
    }

    /// Apply overrides read through `lookup`, returning how many were found
    pub fn apply_overrides<F>(settings: &mut Settings, lookup: F) -> ShrinkResult<usize>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));
        let mut applied = 0;

        if let Some(level) = var("LOG_LEVEL") {
            settings.logging.level = level.to_lowercase();
            applied += 1;
        }
        if let Some(dir) = var("OUTPUT_DIR") {
            settings.output.directory = Some(PathBuf::from(dir));
            applied += 1;
        }
        if let Some(value) = var("OVERWRITE") {
            settings.output.overwrite = parse_bool("VIDSHRINK_OVERWRITE", &value)?;
            applied += 1;
        }
        if let Some(preset) = var("ENCODER_PRESET") {
            settings.encoder.preset = preset;
            applied += 1;
        }
        if let Some(value) = var("THREADS") {
            settings.encoder.threads = value.parse().map_err(|e| {
                ShrinkError::config(format!("invalid VIDSHRINK_THREADS '{}': {}", value, e))
            })?;
            applied += 1;
        }

        if applied > 0 {
            info!("Applied {} environment overrides", applied);
        }
        Ok(applied)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(settings: &Settings) -> ShrinkResult<()> {
        if settings.pipeline.channel_capacity == 0 {
            return Err(ShrinkError::config("pipeline.channel_capacity must be at least 1"));
        }
        let step = settings.pipeline.progress_step;
        if !(step > 0.0 && step <= 1.0) {
            return Err(ShrinkError::config(format!(
                "pipeline.progress_step must be in (0, 1], got {}",
                step
            )));
        }
        if !LOG_LEVELS.contains(&settings.logging.level.as_str()) {
            return Err(ShrinkError::config(format!(
                "unknown log level '{}', expected one of {}",
                settings.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }
        if settings.encoder.codec.trim().is_empty() {
            return Err(ShrinkError::config("encoder.codec must not be empty"));
        }
        Ok(())
    }
}

fn parse_bool(key: &str, value: &str) -> ShrinkResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ShrinkError::config(format!(
            "invalid boolean for {}: '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(TomlConfigAdapter::validate(&settings).is_ok());
        assert!(settings.output.overwrite);
        assert_eq!(settings.pipeline.channel_capacity, 32);
        assert_eq!(settings.encoder.codec, "libx264");
        assert!(settings.encoder.threads >= 1);
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let settings = TomlConfigAdapter::parse(
            r#"
            [pipeline]
            channel_capacity = 4

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();
        assert_eq!(settings.pipeline.channel_capacity, 4);
        assert_eq!(settings.pipeline.progress_step, 0.01);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.encoder.preset, "medium");
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let result = TomlConfigAdapter::parse("[pipeline]\nworkers = 3\n");
        assert!(matches!(result, Err(ShrinkError::Config { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VIDSHRINK_LOG_LEVEL", "WARN"),
            ("VIDSHRINK_OUTPUT_DIR", "/tmp/out"),
            ("VIDSHRINK_OVERWRITE", "no"),
            ("VIDSHRINK_THREADS", "3"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        let applied = TomlConfigAdapter::apply_overrides(&mut settings, |key| {
            vars.get(key).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(applied, 4);
        assert_eq!(settings.logging.level, "warn");
        assert_eq!(settings.output.directory, Some(PathBuf::from("/tmp/out")));
        assert!(!settings.output.overwrite);
        assert_eq!(settings.encoder.threads, 3);
    }

    #[test]
    fn test_env_override_rejects_bad_values() {
        let mut settings = Settings::default();
        let result = TomlConfigAdapter::apply_overrides(&mut settings, |key| {
            (key == "VIDSHRINK_THREADS").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ShrinkError::Config { .. })));
    }

    #[test]
    fn test_validate_rejects_bad_pipeline_settings() {
        let mut settings = Settings::default();
        settings.pipeline.channel_capacity = 0;
        assert!(TomlConfigAdapter::validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.pipeline.progress_step = 0.0;
        assert!(TomlConfigAdapter::validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.logging.level = "loud".to_string();
        assert!(TomlConfigAdapter::validate(&settings).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vidshrink.toml");
        std::fs::write(&path, "[output]\noverwrite = false\n").unwrap();

        let settings = TomlConfigAdapter::load(Some(&path)).unwrap();
        assert!(!settings.output.overwrite);

        let missing = TomlConfigAdapter::load(Some(&dir.path().join("nope.toml")));
        assert!(missing.is_err());
    }
}
