use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;

use crate::domain::models::ResearchConfig;

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Serialized`)
    /// 2. `.maestro/config.yaml` (project config)
    /// 3. `.maestro/local.yaml` (project local overrides, optional)
    /// 4. Environment variables (`MAESTRO_` prefix, highest priority)
    ///
    /// Configuration is always project-local (pwd/.maestro/) so multiple
    /// missions can run against different projects on the same machine.
    pub fn load() -> Result<ResearchConfig> {
        let config: ResearchConfig = Figment::new()
            .merge(Serialized::defaults(ResearchConfig::default()))
            .merge(Yaml::file(".maestro/config.yaml"))
            .merge(Yaml::file(".maestro/local.yaml"))
            .merge(Env::prefixed("MAESTRO_").split("__"))
            .extract()
            .context("failed to extract configuration from figment")?;

        config.validate().context("configuration validation failed")?;
        Ok(config)
    }

    /// Load configuration from a specific file, skipping the project-local
    /// layers. Used by tests and one-off tooling.
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<ResearchConfig> {
        let config: ResearchConfig = Figment::new()
            .merge(Serialized::defaults(ResearchConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("failed to load config from {}", path.as_ref().display()))?;

        config.validate().context("configuration validation failed")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn default_config_extracts_and_validates() {
        let config: ResearchConfig = Figment::new().merge(Serialized::defaults(ResearchConfig::default())).extract().unwrap();
        assert_eq!(config, ResearchConfig::default());
        config.validate().expect("default config should be valid");
    }

    #[test]
    fn yaml_override_wins_over_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "structured_research_rounds: 5\nwriting_passes: 3").unwrap();
        file.flush().unwrap();

        let config = ConfigLoader::load_from_file(file.path()).unwrap();
        assert_eq!(config.structured_research_rounds, 5);
        assert_eq!(config.writing_passes, 3);
        assert_eq!(config.max_concurrent_requests, ResearchConfig::default().max_concurrent_requests);
    }

    #[test]
    fn invalid_hybrid_weights_fail_validation() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "rag:\n  hybrid_weights:\n    dense_w: 0.9\n    sparse_w: 0.9").unwrap();
        file.flush().unwrap();

        let result = ConfigLoader::load_from_file(file.path());
        assert!(result.is_err());
    }

    #[test]
    fn env_override_uses_double_underscore_for_nesting() {
        unsafe {
            env::set_var("MAESTRO_MAX_CONCURRENT_REQUESTS", "42");
        }
        let config: ResearchConfig = Figment::new()
            .merge(Serialized::defaults(ResearchConfig::default()))
            .merge(Env::prefixed("MAESTRO_").split("__"))
            .extract()
            .unwrap();
        assert_eq!(config.max_concurrent_requests, 42);
        unsafe {
            env::remove_var("MAESTRO_MAX_CONCURRENT_REQUESTS");
        }
    }

    #[test]
    fn hierarchical_merging_prefers_the_last_file() {
        let mut base = NamedTempFile::new().unwrap();
        writeln!(base, "structured_research_rounds: 1\nwriting_passes: 1").unwrap();
        base.flush().unwrap();

        let mut over = NamedTempFile::new().unwrap();
        writeln!(over, "structured_research_rounds: 4").unwrap();
        over.flush().unwrap();

        let config: ResearchConfig = Figment::new()
            .merge(Serialized::defaults(ResearchConfig::default()))
            .merge(Yaml::file(base.path()))
            .merge(Yaml::file(over.path()))
            .extract()
            .unwrap();

        assert_eq!(config.structured_research_rounds, 4, "override file should win");
        assert_eq!(config.writing_passes, 1, "base value should persist when not overridden");
    }
}
