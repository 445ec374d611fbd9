use crate::groups;

/// Primary configuration struct containing all config sections
#[derive(Debug, Clone, Default)]
pub struct FetchConfig {
    pub fetch: groups::fetch::ConfigValues,
    pub validation: groups::validation::ConfigValues,
    pub log: groups::log::ConfigValues,
}

impl FetchConfig {
    /// Create a new FetchConfig instance with default values and apply environment variable overrides.
    /// This is equivalent to `FetchConfig::default().with_env_overrides()`.
    pub fn new() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply environment variable overrides to all configuration sections.
    /// Environment variables follow the pattern: CONTENT_FETCH_{GROUP_NAME}_{FIELD_NAME}
    pub fn with_env_overrides(mut self) -> Self {
        self.fetch.apply_env_overrides();
        self.validation.apply_env_overrides();
        self.log.apply_env_overrides();
        self
    }
}
