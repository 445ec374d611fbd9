/// Macro to create a configuration value group struct.
///
/// Usage:
/// ```rust
/// mod fetch_limits {
///     fetch_config::config_group!({
///         ref TEST_INT: usize = 42;
///         ref TEST_STRING: String = "default".to_string();
///     });
/// }
///
/// let mut values = fetch_limits::ConfigValueGroup::new();
/// values.apply_env_overrides();
/// ```
///
/// This creates a `ConfigValueGroup` struct with the specified fields. Environment overrides are read
/// from variables named after the enclosing module, e.g. `CONTENT_FETCH_FETCH_LIMITS_TEST_INT` above.
#[macro_export]
macro_rules! config_group {
    ({
        $(
            $(#[$meta:meta])*
            ref $name:ident : $type:ty = $value:expr;
        )+
    }) => {
        #[allow(unused_imports)]
        use $crate::ParsableConfigValue;

        /// ConfigValueGroup struct containing all configurable values
        #[derive(Debug, Clone)]
        pub struct ConfigValueGroup {
            $(
                $(#[$meta])*
                #[allow(non_snake_case)]
                pub $name: $type,
            )+
        }

        impl Default for ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            fn default() -> Self {
                Self {
                    $(
                        $name: {
                            let v: $type = $value;
                            v
                        },
                    )+
                }
            }
        }

        impl AsRef<ConfigValueGroup> for ConfigValueGroup {
            fn as_ref(&self) -> &ConfigValueGroup {
                self
            }
        }

        impl ConfigValueGroup {
            /// Create a new instance with default values only (no environment variable overrides).
            /// This is an alias for `Default::default()`.
            pub fn new() -> Self {
                Self::default()
            }

            /// Apply environment variable overrides to this configuration group.
            ///
            /// The group name is derived from the module path. For example, in module `fetch_config::groups::fetch`,
            /// the env var for PIPELINE_SIZE would be CONTENT_FETCH_FETCH_PIPELINE_SIZE.
            pub fn apply_env_overrides(&mut self) {
                $(
                    {
                        let env_var_name = $crate::env_var_name(module_path!(), stringify!($name));
                        let maybe_env_value = std::env::var(&env_var_name).ok();
                        let default_value: $type = $value;
                        self.$name = <$type>::parse(&env_var_name, maybe_env_value, default_value);
                    }
                )+
            }
        }

        /// Type alias for easier reference in config aggregation.
        pub type ConfigValues = ConfigValueGroup;
    };
}
