//! Configuration initialization and hierarchy management

use anyhow::{Context, Result};

use crate::adapters::{Settings, TomlConfigAdapter};
use crate::cli::Cli;

/// Build settings with precedence CLI > environment > file > defaults
pub fn initialize_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        TomlConfigAdapter::load(cli.config.as_deref()).context("Failed to load configuration")?;
    TomlConfigAdapter::apply_env(&mut settings).context("Invalid environment override")?;
    apply_cli_overrides(&mut settings, cli);
    TomlConfigAdapter::validate(&settings).context("Invalid configuration")?;
    Ok(settings)
}

/// Apply command line flags on top of the loaded settings
pub fn apply_cli_overrides(settings: &mut Settings, cli: &Cli) {
    if let Some(level) = &cli.log_level {
        settings.logging.level = level.to_lowercase();
    }
    if cli.log_json {
        settings.logging.json = true;
    }
    if let Some(overwrite) = cli.overwrite_override() {
        settings.output.overwrite = overwrite;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_overrides_win() {
        let cli = Cli::parse_from([
            "vidshrink",
            "--log-level",
            "DEBUG",
            "--no-overwrite",
            "inspect",
            "--input",
            "in.mp4",
        ]);
        let mut settings = Settings::default();
        apply_cli_overrides(&mut settings, &cli);
        assert_eq!(settings.logging.level, "debug");
        assert!(!settings.output.overwrite);
    }

    #[test]
    fn test_no_flags_keep_settings() {
        let cli = Cli::parse_from(["vidshrink", "inspect", "-i", "in.mp4"]);
        let mut settings = Settings::default();
        settings.output.overwrite = false;
        apply_cli_overrides(&mut settings, &cli);
        assert!(!settings.output.overwrite);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[pipeline]\nchannel_capacity = 8\n").unwrap();

        let config = path.to_string_lossy().into_owned();
        let cli = Cli::parse_from(["vidshrink", "--config", &config, "inspect", "-i", "in.mp4"]);
        let settings = initialize_settings(&cli).unwrap();
        assert_eq!(settings.pipeline.channel_capacity, 8);
    }
}
