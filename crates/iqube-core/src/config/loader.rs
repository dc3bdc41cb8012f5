//! Layered configuration loading

use super::validation::ValidationError;
use super::IqubeConfig;
use crate::errors::{IqubeError, Result};
use crate::policy::PolicyStrategy;
use std::path::{Path, PathBuf};

/// Overrides `policy.strategy`
pub const ENV_POLICY_STRATEGY: &str = "IQUBE_POLICY_STRATEGY";
/// Overrides `sealing.kdf_iterations`
pub const ENV_KDF_ITERATIONS: &str = "IQUBE_KDF_ITERATIONS";

/// Where configuration values came from, lowest priority first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Compiled-in defaults
    Defaults,
    /// A TOML file
    File(PathBuf),
    /// Environment variables, by name
    Environment(Vec<String>),
    /// Command-line flags
    CliArgs,
}

/// Builds an [`IqubeConfig`] from defaults, a file, the environment and flags
///
/// Each layer overwrites what came before; `build` validates the result.
#[derive(Debug)]
pub struct ConfigLoader {
    config: IqubeConfig,
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Start from the defaults
    pub fn new() -> Self {
        Self {
            config: IqubeConfig::default(),
            sources: vec![ConfigSource::Defaults],
        }
    }

    /// Replace the configuration with a TOML file; missing sections keep defaults
    pub fn with_file(mut self, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IqubeError::config(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        self.config = toml::from_str(&content).map_err(|e| {
            IqubeError::config(format!("Invalid TOML in {}: {e}", path.display()))
        })?;
        self.sources.push(ConfigSource::File(path.to_path_buf()));
        Ok(self)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Result<Self> {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides using `lookup` in place of the process environment
    pub fn with_env_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut applied = Vec::new();

        if let Some(raw) = lookup(ENV_POLICY_STRATEGY) {
            self.config.policy.strategy = raw.parse()?;
            applied.push(ENV_POLICY_STRATEGY.to_string());
        }

        if let Some(raw) = lookup(ENV_KDF_ITERATIONS) {
            self.config.sealing.kdf_iterations =
                raw.trim()
                    .parse()
                    .map_err(|_| ValidationError::InvalidFormat {
                        field: ENV_KDF_ITERATIONS.to_string(),
                        expected: "unsigned integer".to_string(),
                        actual: raw.clone(),
                    })?;
            applied.push(ENV_KDF_ITERATIONS.to_string());
        }

        if !applied.is_empty() {
            self.sources.push(ConfigSource::Environment(applied));
        }
        Ok(self)
    }

    /// Apply a strategy chosen on the command line
    pub fn with_strategy(mut self, strategy: Option<PolicyStrategy>) -> Self {
        if let Some(strategy) = strategy {
            self.config.policy.strategy = strategy;
            self.sources.push(ConfigSource::CliArgs);
        }
        self
    }

    /// Sources applied so far
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<IqubeConfig> {
        self.config.validate()?;
        tracing::debug!(sources = ?self.sources, strategy = %self.config.policy.strategy, "loaded configuration");
        Ok(self.config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let loader = ConfigLoader::new()
            .with_env_from(lookup(&[
                (ENV_POLICY_STRATEGY, "two-tier"),
                (ENV_KDF_ITERATIONS, "250000"),
            ]))
            .unwrap();
        assert_eq!(
            loader.sources(),
            &[
                ConfigSource::Defaults,
                ConfigSource::Environment(vec![
                    ENV_POLICY_STRATEGY.to_string(),
                    ENV_KDF_ITERATIONS.to_string()
                ]),
            ]
        );
        let config = loader.build().unwrap();
        assert_eq!(config.policy.strategy, PolicyStrategy::TwoTier);
        assert_eq!(config.sealing.kdf_iterations, 250_000);
    }

    #[test]
    fn test_env_bad_values() {
        let err = ConfigLoader::new()
            .with_env_from(lookup(&[(ENV_KDF_ITERATIONS, "lots")]))
            .unwrap_err();
        assert_matches!(err, IqubeError::Config { ref message } if message.contains(ENV_KDF_ITERATIONS));

        let err = ConfigLoader::new()
            .with_env_from(lookup(&[(ENV_POLICY_STRATEGY, "three-tier")]))
            .unwrap_err();
        assert_matches!(err, IqubeError::Config { .. });
    }

    #[test]
    fn test_env_weak_kdf_fails_build() {
        let loader = ConfigLoader::new()
            .with_env_from(lookup(&[(ENV_KDF_ITERATIONS, "10")]))
            .unwrap();
        assert_matches!(loader.build(), Err(IqubeError::Config { .. }));
    }

    #[test]
    fn test_file_then_env_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("iqube.toml");
        std::fs::write(&path, "[policy]\nstrategy = \"two-tier\"\n").unwrap();

        let config = ConfigLoader::new()
            .with_file(&path)
            .unwrap()
            .with_env_from(lookup(&[(ENV_POLICY_STRATEGY, "four-tier")]))
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(config.policy.strategy, PolicyStrategy::FourTier);
    }

    #[test]
    fn test_cli_strategy_wins() {
        let loader = ConfigLoader::new()
            .with_env_from(lookup(&[(ENV_POLICY_STRATEGY, "four-tier")]))
            .unwrap()
            .with_strategy(Some(PolicyStrategy::TwoTier));
        assert_eq!(loader.sources().last(), Some(&ConfigSource::CliArgs));
        assert_eq!(loader.build().unwrap().policy.strategy, PolicyStrategy::TwoTier);
    }

    #[test]
    fn test_missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        assert_matches!(
            ConfigLoader::new().with_file(&dir.path().join("absent.toml")),
            Err(IqubeError::Config { .. })
        );

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[scoring]\nunknown = 1\n").unwrap();
        assert_matches!(
            ConfigLoader::new().with_file(&path),
            Err(IqubeError::Config { .. })
        );
    }

    #[test]
    #[serial]
    fn test_process_environment() {
        std::env::set_var(ENV_POLICY_STRATEGY, "two-tier");
        std::env::remove_var(ENV_KDF_ITERATIONS);
        let config = IqubeConfig::load(None, None);
        let flagged = IqubeConfig::load(None, Some(PolicyStrategy::FourTier));
        std::env::remove_var(ENV_POLICY_STRATEGY);

        assert_eq!(config.unwrap().policy.strategy, PolicyStrategy::TwoTier);
        assert_eq!(flagged.unwrap().policy.strategy, PolicyStrategy::FourTier);
    }

    #[test]
    #[serial]
    fn test_load_without_environment() {
        std::env::remove_var(ENV_POLICY_STRATEGY);
        std::env::remove_var(ENV_KDF_ITERATIONS);
        assert_eq!(IqubeConfig::load(None, None).unwrap(), IqubeConfig::default());
    }
}
