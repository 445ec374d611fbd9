#![allow(non_snake_case)]

use fetch_config::{EnvVarGuard, FetchConfig, config_group};
use serial_test::serial;

mod retry_limits {
    use super::*;
    config_group!({
        ref TEST_INT: usize = 42;
        ref TEST_FLAG: bool = false;
    });
}

#[test]
fn test_defaults() {
    let config = FetchConfig::default();

    assert_eq!(config.fetch.max_concurrent_fetches, 8);
    assert_eq!(config.fetch.pipeline_size, 4);
    assert_eq!(config.fetch.default_segment_size, 8192);
    assert!(!config.validation.strict);
    assert_eq!(config.log.dest, None);
    assert_eq!(config.log.prefix, "content_fetch");
}

#[test]
#[serial(config_env)]
fn test_custom_group_reads_module_named_variables() {
    let _guard = EnvVarGuard::set("CONTENT_FETCH_RETRY_LIMITS_TEST_INT", "7");
    let _guard2 = EnvVarGuard::set("CONTENT_FETCH_RETRY_LIMITS_TEST_FLAG", "yes");

    let mut values = retry_limits::ConfigValueGroup::new();
    assert_eq!(values.TEST_INT, 42);

    values.apply_env_overrides();
    assert_eq!(values.TEST_INT, 7);
    assert!(values.TEST_FLAG);
}

#[test]
#[serial(config_env)]
fn test_group_name_env_var_prefixing() {
    let _guard = EnvVarGuard::set("CONTENT_FETCH_FETCH_PIPELINE_SIZE", "16");
    let _guard2 = EnvVarGuard::set("CONTENT_FETCH_VALIDATION_STRICT", "true");
    let config = FetchConfig::new();

    assert_eq!(config.fetch.pipeline_size, 16);
    assert!(config.validation.strict);
    assert_eq!(config.fetch.max_concurrent_fetches, 8);
}

#[test]
#[serial(config_env)]
fn test_bad_values_fall_back_to_defaults() {
    let _guard = EnvVarGuard::set("CONTENT_FETCH_FETCH_MAX_CONCURRENT_FETCHES", "many");
    let config = FetchConfig::new();

    assert_eq!(config.fetch.max_concurrent_fetches, 8);
}

#[test]
#[serial(config_env)]
fn test_guard_restores_environment() {
    {
        let _guard = EnvVarGuard::set("CONTENT_FETCH_LOG_FORMAT", "json");
        assert_eq!(FetchConfig::new().log.format.as_deref(), Some("json"));
    }
    assert_eq!(FetchConfig::new().log.format, None);
}
