use std::env;
use std::ffi::OsStr;

/// Guard that sets an environment variable and restores the previous value (or absence) on drop.
///
/// # Examples
///
/// ```
/// use fetch_config::EnvVarGuard;
///
/// let _guard = EnvVarGuard::set("CONTENT_FETCH_DOC_EXAMPLE", "test_value");
/// assert_eq!(std::env::var("CONTENT_FETCH_DOC_EXAMPLE").unwrap(), "test_value");
/// ```
pub struct EnvVarGuard {
    key: &'static str,
    prev: Option<String>,
}

impl EnvVarGuard {
    pub fn set(key: &'static str, value: impl AsRef<OsStr>) -> Self {
        let prev = env::var(key).ok();
        unsafe {
            env::set_var(key, value);
        }
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        if let Some(v) = &self.prev {
            unsafe {
                env::set_var(self.key, v);
            }
        } else {
            unsafe {
                env::remove_var(self.key);
            }
        }
    }
}
