crate::config_group!({

    /// The maximum number of segment windows requested concurrently by the local segment fetcher.
    ///
    /// The default value is 8.
    ///
    /// Use the environment variable `CONTENT_FETCH_FETCH_MAX_CONCURRENT_FETCHES` to set this value.
    ref max_concurrent_fetches: usize = 8;

    /// The number of segments requested together in one window.  Each window arrives at the
    /// orchestrator as a single batch.
    ///
    /// The default value is 4.
    ///
    /// Use the environment variable `CONTENT_FETCH_FETCH_PIPELINE_SIZE` to set this value.
    ref pipeline_size: usize = 4;

    /// The payload size of a segment when publishing content into a local store.
    ///
    /// The default value is 8192 bytes.
    ///
    /// Use the environment variable `CONTENT_FETCH_FETCH_DEFAULT_SEGMENT_SIZE` to set this value.
    ref default_segment_size: usize = 8192;
});
