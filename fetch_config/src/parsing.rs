use std::str::FromStr;

use tracing::{debug, info, warn};

/// Prefix shared by every configuration environment variable.
pub const ENV_PREFIX: &str = "CONTENT_FETCH";

/// Builds `CONTENT_FETCH_<GROUP>_<FIELD>` where the group is the last segment of the module path.
pub fn env_var_name(module_path: &str, field_name: &str) -> String {
    let group_name = module_path.rsplit("::").next().unwrap_or(module_path);
    format!("{ENV_PREFIX}_{}_{}", group_name.to_ascii_uppercase(), field_name.to_ascii_uppercase())
}

/// A trait to control how a value is parsed from an environment string or other config source
/// if it's present.
pub trait ParsableConfigValue: std::fmt::Debug + Sized {
    fn parse_user_value(value: &str) -> Option<Self>;

    /// Parse the value, returning the default if it can't be parsed or the string is empty.
    /// Issue a warning if it can't be parsed.
    fn parse(variable_name: &str, value: Option<String>, default: Self) -> Self {
        match value {
            Some(v) => match Self::parse_user_value(&v) {
                Some(v) => {
                    info!("Config: {variable_name} = {v:?} (user set)");
                    v
                },
                None => {
                    warn!(
                        "Configuration value {v} for {variable_name} cannot be parsed into correct type; reverting to default."
                    );
                    info!("Config: {variable_name} = {default:?} (default due to parse error)");
                    default
                },
            },
            None => {
                debug!("Config: {variable_name} = {default:?} (default)");
                default
            },
        }
    }
}

/// Most values work with the FromStr implementation, but we want to override the behavior for some types
/// (e.g. Option<T> and bool) to have custom parsing behavior.
pub trait FromStrParseable: FromStr + std::fmt::Debug {}

impl<T: FromStrParseable> ParsableConfigValue for T {
    fn parse_user_value(value: &str) -> Option<Self> {
        value.trim().parse::<T>().ok()
    }
}

impl FromStrParseable for usize {}
impl FromStrParseable for u16 {}
impl FromStrParseable for u32 {}
impl FromStrParseable for u64 {}
impl FromStrParseable for i64 {}
impl FromStrParseable for f64 {}
impl FromStrParseable for String {}

/// Special handling for bool:
/// - true: "1","true","yes","y","on"  -> true
/// - false: "0","false","no","n","off","" -> false
fn parse_bool_value(value: &str) -> Option<bool> {
    let t = value.trim().to_ascii_lowercase();

    match t.as_str() {
        "0" | "false" | "no" | "n" | "off" | "" => Some(false),
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        _ => None,
    }
}

impl ParsableConfigValue for bool {
    fn parse_user_value(value: &str) -> Option<Self> {
        parse_bool_value(value)
    }
}

/// Enable Option<T> to allow the default value to be None if nothing is set and appear as
/// Some(Value) if the user specifies the value.
impl<T: ParsableConfigValue> ParsableConfigValue for Option<T> {
    fn parse_user_value(value: &str) -> Option<Self> {
        T::parse_user_value(value).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_var_name_uses_last_module_segment() {
        assert_eq!(env_var_name("fetch_config::groups::fetch", "pipeline_size"), "CONTENT_FETCH_FETCH_PIPELINE_SIZE");
        assert_eq!(env_var_name("log", "dest"), "CONTENT_FETCH_LOG_DEST");
    }

    #[test]
    fn test_bool_words() {
        for v in ["1", "true", "YES", " on "] {
            assert_eq!(bool::parse_user_value(v), Some(true), "{v}");
        }
        for v in ["0", "false", "No", "off", ""] {
            assert_eq!(bool::parse_user_value(v), Some(false), "{v}");
        }
        assert_eq!(bool::parse_user_value("maybe"), None);
    }

    #[test]
    fn test_unparseable_value_reverts_to_default() {
        let v = usize::parse("CONTENT_FETCH_TEST", Some("lots".to_string()), 8);
        assert_eq!(v, 8);

        let v = usize::parse("CONTENT_FETCH_TEST", Some(" 12 ".to_string()), 8);
        assert_eq!(v, 12);
    }

    #[test]
    fn test_option_values() {
        let v: Option<String> = Option::<String>::parse("CONTENT_FETCH_TEST", None, None);
        assert_eq!(v, None);

        let v: Option<String> = Option::<String>::parse("CONTENT_FETCH_TEST", Some("json".to_string()), None);
        assert_eq!(v.as_deref(), Some("json"));
    }
}
