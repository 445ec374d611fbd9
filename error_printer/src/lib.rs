use std::fmt::{Debug, Display};
use std::panic::Location;

use tracing::{error, warn};

/// A helper trait to log errors at a call site and pass the result through unchanged.
///
/// The caller location is attached to every emitted event so that errors which are
/// otherwise swallowed (e.g. `let _ = sink.flush().warn_error(..)`) can still be traced.
pub trait ErrorPrinter {
    fn log_error<M: Display>(self, message: M) -> Self;

    fn warn_error<M: Display>(self, message: M) -> Self;
}

impl<T, E: Debug> ErrorPrinter for Result<T, E> {
    #[track_caller]
    fn log_error<M: Display>(self, message: M) -> Self {
        if let Err(ref e) = self {
            let caller = get_caller();
            error!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }

    #[track_caller]
    fn warn_error<M: Display>(self, message: M) -> Self {
        if let Err(ref e) = self {
            let caller = get_caller();
            warn!(caller = %caller, "{message}, error: {e:?}");
        }
        self
    }
}

#[track_caller]
fn get_caller() -> String {
    let location = Location::caller();
    format!("{}:{}", location.file(), location.line())
}

#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn test_log_error_passes_through() {
        let res: Result<u32, String> = Err("boom".to_string());
        let res = res.log_error("sink flush failed");
        assert!(res.is_err());
        assert!(logs_contain("sink flush failed"));
        assert!(logs_contain("boom"));
    }

    #[test]
    #[traced_test]
    fn test_warn_error_records_caller() {
        let res: Result<(), String> = Err("disk full".to_string());
        let _ = res.warn_error("flush before failure");
        assert!(logs_contain("flush before failure"));
        assert!(logs_contain("lib.rs"));
    }

    #[test]
    #[traced_test]
    fn test_ok_is_silent() {
        let res: Result<u32, String> = Ok(7);
        assert_eq!(res.warn_error("should not appear").unwrap(), 7);
        assert!(!logs_contain("should not appear"));
    }
}
