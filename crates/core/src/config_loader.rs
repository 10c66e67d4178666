use crate::config::AppConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration by merging the default TOML file and
    /// `DUAL_`-prefixed environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// configuration is invalid.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads application configuration from a specific TOML file.
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    /// Nested keys are addressed with a double underscore, e.g.
    /// `DUAL_INVEST__INVESTMENT_AMOUNT=50`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// configuration is invalid.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("DUAL_").split("__"))
            .extract()
            .with_context(|| format!("Failed to load configuration from {path}"))?;

        config.validate()?;

        tracing::debug!(
            path,
            interval_minutes = config.schedule.interval_minutes,
            currency = %config.invest.currency,
            "Configuration loaded"
        );

        Ok(config)
    }
}
