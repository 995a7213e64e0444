//! In-memory telemetry aggregation.
//!
//! The aggregator keeps a per-device track of the last accepted sample and a
//! working set of bucket totals. Elapsed time between consecutive samples is
//! attributed to the previous sample's running state: power-on minutes accrue
//! for the whole delta (a reporting machine is a powered machine), running
//! minutes accrue only when the previous sample reported running. Deltas are
//! capped at the configured gap so an offline device does not back-fill hours
//! of phantom uptime when it reconnects.
//!
//! All mutation happens behind a std `Mutex`; no lock is held across awaits.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::models::metric_bucket::{BucketKey, BucketSnapshot};
use crate::models::telemetry::{ClassifiedSample, DropReason};

/// Tuning knobs for the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorConfig {
    /// Largest elapsed delta a single sample may contribute.
    pub max_sample_gap: Duration,
    /// Device tracks idle longer than this are dropped on eviction.
    pub track_idle_after: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_sample_gap: Duration::minutes(15),
            track_idle_after: Duration::hours(12),
        }
    }
}

/// Last accepted sample per device, used for delta attribution and
/// stale-sample rejection.
#[derive(Debug, Clone, Copy)]
struct DeviceTrack {
    last_timestamp: DateTime<Utc>,
    last_running: bool,
    last_seen: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct AggregatorState {
    tracks: HashMap<Uuid, DeviceTrack>,
    buckets: HashMap<BucketKey, BucketSnapshot>,
    dirty: HashSet<BucketKey>,
}

/// Working-set size counters for gauge export.
#[derive(Debug, Clone, Copy)]
pub struct AggregatorStats {
    pub tracked_devices: usize,
    pub bucket_count: usize,
    pub dirty_count: usize,
}

/// Shared aggregation state for the ingestion path and the flush job.
#[derive(Debug)]
pub struct Aggregator {
    config: AggregatorConfig,
    state: Mutex<AggregatorState>,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            config,
            state: Mutex::new(AggregatorState::default()),
        }
    }

    /// Whether a bucket is already resident in the working set.
    ///
    /// The ingestion path checks this before loading a persisted row to seed
    /// from; a double-seed race between two requests is harmless because
    /// seeding merges by maximum.
    pub fn has_bucket(&self, key: &BucketKey) -> bool {
        self.state.lock().unwrap().buckets.contains_key(key)
    }

    /// Merges a persisted snapshot into the working set without marking the
    /// bucket dirty. Totals already in memory always win ties.
    pub fn seed(&self, snapshot: BucketSnapshot) {
        let mut state = self.state.lock().unwrap();
        state
            .buckets
            .entry(snapshot.key)
            .and_modify(|existing| *existing = existing.merge_max(&snapshot))
            .or_insert(snapshot);
    }

    /// Folds a classified sample into its bucket.
    ///
    /// Returns the updated snapshot, or the reason the sample was rejected.
    /// A sample at exactly the device's last timestamp is a duplicate and
    /// contributes a zero delta; only strictly older samples are stale.
    pub fn apply(&self, classified: ClassifiedSample) -> Result<BucketSnapshot, DropReason> {
        let sample = classified.sample;
        let key = BucketKey {
            device_id: sample.device_id,
            organization_id: sample.organization_id,
            shift_id: classified.shift_id,
            shift_date: classified.shift_date,
        };

        let mut state = self.state.lock().unwrap();

        let delta = match state.tracks.get(&sample.device_id) {
            Some(track) => {
                if sample.observed_at < track.last_timestamp {
                    return Err(DropReason::StaleSample);
                }
                let elapsed = sample.observed_at - track.last_timestamp;
                let capped = elapsed.min(self.config.max_sample_gap);
                if capped < elapsed {
                    debug!(
                        device_id = %sample.device_id,
                        elapsed_secs = elapsed.num_seconds(),
                        "Sample gap exceeds cap, truncating delta"
                    );
                }
                Some((capped, track.last_running))
            }
            // First sample for this device establishes the track only.
            None => None,
        };

        let bucket = state.buckets.entry(key).or_insert(BucketSnapshot {
            key,
            power_on_minutes: 0.0,
            running_minutes: 0.0,
            current_rpm: sample.rpm,
            last_sample_at: sample.observed_at,
        });

        if let Some((capped, was_running)) = delta {
            let minutes = capped.num_milliseconds() as f64 / 60_000.0;
            bucket.power_on_minutes += minutes;
            if was_running {
                bucket.running_minutes += minutes;
            }
        }
        if sample.observed_at >= bucket.last_sample_at {
            bucket.current_rpm = sample.rpm;
            bucket.last_sample_at = sample.observed_at;
        }
        let snapshot = *bucket;

        state.tracks.insert(
            sample.device_id,
            DeviceTrack {
                last_timestamp: sample.observed_at,
                last_running: sample.running,
                last_seen: Utc::now(),
            },
        );
        state.dirty.insert(key);

        Ok(snapshot)
    }

    /// Takes the snapshots of all buckets touched since the last drain and
    /// clears their dirty marks.
    pub fn drain_dirty(&self) -> Vec<BucketSnapshot> {
        let mut state = self.state.lock().unwrap();
        let keys: Vec<BucketKey> = state.dirty.drain().collect();
        keys.iter()
            .filter_map(|k| state.buckets.get(k).copied())
            .collect()
    }

    /// Drops idle device tracks and clean buckets for closed shift-dates.
    ///
    /// A bucket survives eviction while dirty (unflushed totals) or while its
    /// shift-date is today or yesterday, since a wrap-past-midnight shift
    /// still writes to yesterday's date.
    pub fn evict(&self, now: DateTime<Utc>) -> (usize, usize) {
        let mut state = self.state.lock().unwrap();

        let idle_cutoff = now - self.config.track_idle_after;
        let before_tracks = state.tracks.len();
        state.tracks.retain(|_, track| track.last_seen >= idle_cutoff);
        let evicted_tracks = before_tracks - state.tracks.len();

        let date_cutoff = now.date_naive().pred_opt().unwrap_or(now.date_naive());
        let dirty = state.dirty.clone();
        let before_buckets = state.buckets.len();
        state
            .buckets
            .retain(|key, _| dirty.contains(key) || key.shift_date >= date_cutoff);
        let evicted_buckets = before_buckets - state.buckets.len();

        (evicted_tracks, evicted_buckets)
    }

    pub fn stats(&self) -> AggregatorStats {
        let state = self.state.lock().unwrap();
        AggregatorStats {
            tracked_devices: state.tracks.len(),
            bucket_count: state.buckets.len(),
            dirty_count: state.dirty.len(),
        }
    }
}
