use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use bytes::Bytes;
use fetch_config::FetchGroupConfig;
use parking_lot::{Mutex, RwLock};
use rand::seq::SliceRandom;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::error::{ContentFetchError, Result};
use crate::handles::{DiscoveryHandle, FetchHandle};
use crate::interfaces::{SegmentFetcher, VersionDiscoverer};
use crate::name::{BaseName, VersionedName};
use crate::segment::{Segment, SegmentBatch, SegmentNumber};
use crate::validation::DigestValidator;

#[derive(Default)]
struct Faults {
    dropped: HashSet<SegmentNumber>,
    corrupted: HashSet<SegmentNumber>,
}

/// An in-process content repository that serves published objects through the
/// [`VersionDiscoverer`] and [`SegmentFetcher`] interfaces.
///
/// Each published object is cut into segments signed for [`DigestValidator`].  Fetches request
/// windows of `pipeline_size` segments with up to `max_concurrent_fetches` windows in flight and
/// deliver them in random order, which exercises reassembly the way a real network would.
///
/// Fetching spawns onto the current tokio runtime.
pub struct LocalContentStore {
    objects: RwLock<HashMap<BaseName, BTreeMap<u64, Arc<Vec<Segment>>>>>,
    faults: Mutex<Faults>,
    max_concurrent_fetches: usize,
    pipeline_size: usize,
}

impl LocalContentStore {
    pub fn new(max_concurrent_fetches: usize, pipeline_size: usize) -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            faults: Mutex::new(Faults::default()),
            max_concurrent_fetches: max_concurrent_fetches.max(1),
            pipeline_size: pipeline_size.max(1),
        }
    }

    pub fn from_config(config: &FetchGroupConfig) -> Self {
        Self::new(config.max_concurrent_fetches, config.pipeline_size)
    }

    /// Publishes `data` as version `version` of `base_name`, cut into `segment_size` byte segments.
    /// Empty content is published as a single empty segment.
    pub fn publish(
        &self,
        base_name: &BaseName,
        version: u64,
        data: impl Into<Bytes>,
        segment_size: usize,
    ) -> Result<VersionedName> {
        if segment_size == 0 {
            return Err(ContentFetchError::ConfigurationError("segment size must be positive".to_string()));
        }

        let data: Bytes = data.into();
        let name = base_name.with_version(version);

        let num_segments = data.len().div_ceil(segment_size).max(1);
        let final_segment = (num_segments - 1) as SegmentNumber;

        let segments = (0..num_segments)
            .map(|i| {
                let start = (i * segment_size).min(data.len());
                let end = ((i + 1) * segment_size).min(data.len());
                let payload = data.slice(start..end);
                let number = i as SegmentNumber;
                let signature = DigestValidator::sign(&name, number, Some(final_segment), &payload);
                Segment::new(number, payload)
                    .with_final_segment(final_segment)
                    .with_signature(signature)
            })
            .collect::<Vec<_>>();

        info!(name = %name, segments = segments.len(), bytes = data.len(), "published object");

        self.objects
            .write()
            .entry(base_name.clone())
            .or_default()
            .insert(version, Arc::new(segments));

        Ok(name)
    }

    pub fn latest_version(&self, base_name: &BaseName) -> Option<u64> {
        self.objects
            .read()
            .get(base_name)
            .and_then(|versions| versions.keys().next_back().copied())
    }

    /// The segment is never delivered by subsequent fetches.
    pub fn drop_segment(&self, number: SegmentNumber) {
        self.faults.lock().dropped.insert(number);
    }

    /// The segment is delivered with a damaged payload but its original signature.
    pub fn corrupt_segment(&self, number: SegmentNumber) {
        self.faults.lock().corrupted.insert(number);
    }

    fn segments_for(&self, name: &VersionedName) -> Option<Vec<Segment>> {
        let object = self.objects.read().get(name.base())?.get(&name.version())?.clone();
        let faults = self.faults.lock();

        let segments = object
            .iter()
            .filter(|s| !faults.dropped.contains(&s.number()))
            .map(|s| {
                if faults.corrupted.contains(&s.number()) {
                    let mut damaged = s.payload().to_vec();
                    match damaged.first_mut() {
                        Some(b) => *b ^= 0xff,
                        None => damaged.push(0),
                    }
                    let damaged = Segment::new(s.number(), damaged).with_signature(s.signature().clone());
                    match s.final_segment() {
                        Some(final_segment) => damaged.with_final_segment(final_segment),
                        None => damaged,
                    }
                } else {
                    s.clone()
                }
            })
            .collect();

        Some(segments)
    }
}

impl VersionDiscoverer for LocalContentStore {
    fn discover(&self, base_name: &BaseName, reply: DiscoveryHandle) {
        match self.latest_version(base_name) {
            Some(version) => reply.succeed(base_name.with_version(version)),
            None => reply.fail(format!("no version found for {base_name}")),
        }
    }
}

impl SegmentFetcher for LocalContentStore {
    fn fetch(&self, name: &VersionedName, handle: FetchHandle) {
        let Some(segments) = self.segments_for(name) else {
            handle.fail(format!("no such object: {name}"));
            return;
        };

        let mut windows: Vec<SegmentBatch> = segments
            .chunks(self.pipeline_size)
            .map(|window| window.iter().map(|s| (s.number(), s.clone())).collect())
            .collect();
        windows.shuffle(&mut rand::rng());

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_fetches));
        let name = name.clone();

        tokio::spawn(async move {
            let mut tasks = JoinSet::new();

            for window in windows {
                let permit = tokio::select! {
                    _ = handle.cancelled() => break,
                    permit = semaphore.clone().acquire_owned() => permit,
                };
                let Ok(permit) = permit else {
                    break;
                };

                let handle = handle.clone();
                tasks.spawn(async move {
                    let _permit = permit;
                    tokio::task::yield_now().await;
                    if !handle.is_cancelled() {
                        handle.deliver(window);
                    }
                });
            }

            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    handle.fail(format!("segment request task failed: {e}"));
                    return;
                }
            }

            if handle.is_cancelled() {
                debug!(name = %name, "fetch abandoned; run no longer active");
                return;
            }
            handle.complete();
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_cuts_signed_segments() {
        let store = LocalContentStore::new(2, 2);
        let base: BaseName = "/example/object".parse().unwrap();

        let name = store.publish(&base, 3, "ABCDEFG", 2).unwrap();
        assert_eq!(name.to_string(), "/example/object/v=3");

        let segments = store.segments_for(&name).unwrap();
        assert_eq!(segments.len(), 4);
        assert_eq!(segments[3].payload(), &Bytes::from_static(b"G"));
        assert!(segments.iter().all(|s| s.final_segment() == Some(3)));
        assert!(segments.iter().all(|s| !s.signature().is_empty()));
    }

    #[test]
    fn test_empty_object_is_one_empty_segment() {
        let store = LocalContentStore::new(1, 1);
        let base: BaseName = "/empty".parse().unwrap();

        let name = store.publish(&base, 1, Bytes::new(), 16).unwrap();
        let segments = store.segments_for(&name).unwrap();
        assert_eq!(segments.len(), 1);
        assert!(segments[0].is_empty());
        assert_eq!(segments[0].final_segment(), Some(0));
    }

    #[test]
    fn test_latest_version() {
        let store = LocalContentStore::new(1, 1);
        let base: BaseName = "/example/object".parse().unwrap();
        assert_eq!(store.latest_version(&base), None);

        store.publish(&base, 2, "old", 8).unwrap();
        store.publish(&base, 10, "new", 8).unwrap();
        store.publish(&base, 7, "mid", 8).unwrap();
        assert_eq!(store.latest_version(&base), Some(10));
    }

    #[test]
    fn test_zero_segment_size_rejected() {
        let store = LocalContentStore::new(1, 1);
        let base: BaseName = "/example/object".parse().unwrap();
        assert!(matches!(store.publish(&base, 1, "data", 0), Err(ContentFetchError::ConfigurationError(_))));
    }

    #[test]
    fn test_faults_apply_to_fetches() {
        let store = LocalContentStore::new(1, 1);
        let base: BaseName = "/example/object".parse().unwrap();
        let name = store.publish(&base, 1, "AABBCC", 2).unwrap();

        store.drop_segment(1);
        store.corrupt_segment(2);

        let segments = store.segments_for(&name).unwrap();
        assert_eq!(segments.iter().map(|s| s.number()).collect::<Vec<_>>(), vec![0, 2]);
        assert_ne!(segments[1].payload(), &Bytes::from_static(b"CC"));
    }
}
