//! Weather sample cache keyed by a 0.1 degree grid cell.

use dashmap::DashMap;
use seafleet_core::{GeoPoint, WeatherConditions};
use std::time::{Duration, Instant};

/// Grid cell of a sample, in tenths of a degree.
pub type CellKey = (i32, i32);

pub fn cell_key(point: GeoPoint) -> CellKey {
    ((point.lat * 10.0).round() as i32, (point.lon * 10.0).round() as i32)
}

#[derive(Debug, Clone)]
struct CachedSample {
    conditions: WeatherConditions,
    fetched_at: Instant,
}

#[derive(Debug)]
pub struct WeatherCache {
    entries: DashMap<CellKey, CachedSample>,
    ttl: Duration,
    max_entries: usize,
}

impl WeatherCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached conditions for the cell containing `point`, if still fresh.
    pub fn get(&self, point: GeoPoint) -> Option<WeatherConditions> {
        let entry = self.entries.get(&cell_key(point))?;
        (entry.fetched_at.elapsed() <= self.ttl).then_some(entry.conditions)
    }

    pub fn insert(&self, point: GeoPoint, conditions: WeatherConditions) {
        self.entries.insert(
            cell_key(point),
            CachedSample {
                conditions,
                fetched_at: Instant::now(),
            },
        );
        if self.entries.len() > self.max_entries {
            self.prune();
        }
    }

    /// Drop expired samples, then the oldest ones until the cache fits.
    pub fn prune(&self) {
        let now = Instant::now();
        let mut entries: Vec<(CellKey, Instant)> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().fetched_at))
            .collect();

        for (key, fetched_at) in &entries {
            if now.duration_since(*fetched_at) > self.ttl {
                self.entries.remove(key);
            }
        }

        if self.entries.len() <= self.max_entries {
            return;
        }

        entries.sort_by_key(|(_, fetched_at)| *fetched_at);
        for (key, _) in entries {
            if self.entries.len() <= self.max_entries {
                break;
            }
            self.entries.remove(&key);
        }
    }
}
