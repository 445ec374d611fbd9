crate::config_group!({

    /// If true, the first segment that fails validation terminates the run.  Otherwise rejected
    /// segments are dropped and the run continues, waiting for a valid copy.
    ///
    /// The default value is false.
    ///
    /// Use the environment variable `CONTENT_FETCH_VALIDATION_STRICT` to set this value.
    ref strict: bool = false;
});
