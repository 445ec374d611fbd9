crate::config_group!({

    /// The log destination.  By default, logs go to the console.
    ///
    /// If this path exists as a directory or the path ends with a /, then a log file named after
    /// `prefix`, the current timestamp and the pid is created in that directory.  Otherwise the
    /// path is used as the log file.  If given but empty, logs are dumped to the console.
    ///
    /// The default value is None.
    ///
    /// Use the environment variable `CONTENT_FETCH_LOG_DEST` to set this value.
    ref dest : Option<String> = None;

    /// The format the logs are printed in. If "json", then logs are dumped as json blobs; otherwise they
    /// are treated as text.  By default logging to files is done in json and console logging is done with text.
    ///
    /// The default value is None.
    ///
    /// Use the environment variable `CONTENT_FETCH_LOG_FORMAT` to set this value.
    ref format : Option<String> = None;

    /// The base name for a log file when logging to a directory.
    ///
    /// The default value is "content_fetch".
    ///
    /// Use the environment variable `CONTENT_FETCH_LOG_PREFIX` to set this value.
    ref prefix : String = "content_fetch".to_string();
});
