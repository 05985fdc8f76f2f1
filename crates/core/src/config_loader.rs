use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Default location of the optimizer configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/Optimizer.toml";

/// Prefix for environment overrides, e.g. `RISK_ALLOC_EXTERNAL__API_TOKEN`.
pub const ENV_PREFIX: &str = "RISK_ALLOC_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering defaults, the TOML file and environment variables.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or environment values cannot be parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH, None)
    }

    /// Loads configuration with a specific profile layered over the base file.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH, Some(profile))
    }

    /// Loads configuration from an explicit base path.
    ///
    /// The profile file sits next to the base file as `<stem>.<profile>.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be read or parsed.
    pub fn load_from(path: &str, profile: Option<&str>) -> Result<AppConfig> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path));

        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(profile_path(path, profile)));
        }

        let config: AppConfig = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }
}

fn profile_path(path: &str, profile: &str) -> String {
    match path.strip_suffix(".toml") {
        Some(stem) => format!("{stem}.{profile}.toml"),
        None => format!("{path}.{profile}"),
    }
}
