pub mod groups;
mod guards;
pub mod macros;
mod parsing;

mod fetch_config;

pub use fetch_config::FetchConfig;
pub use guards::EnvVarGuard;
pub use parsing::{ENV_PREFIX, ParsableConfigValue, env_var_name};

pub type FetchGroupConfig = groups::fetch::ConfigValues;
pub type ValidationConfig = groups::validation::ConfigValues;
pub type LogConfig = groups::log::ConfigValues;
