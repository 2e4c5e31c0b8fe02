//! Weather hazard zones along a route corridor.
//!
//! The corridor is sampled at evenly spaced points on the great circle and each
//! sample is looked up in a [`WeatherSource`]. Failed or slow samples are
//! skipped; a source that fails every sample is reported as unavailable so the
//! route engine can switch to the synthetic demo generator.

use crate::error::UpstreamError;
use crate::geodesy::{
    bearing_deg, distance_nm, interpolate, offset_by_bearing, sample_great_circle, GeoPoint,
};
use crate::models::{HazardKind, HazardZone, Severity};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Sea state observed at a single point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub wind_speed_kn: f64,
    pub wave_height_m: f64,
    /// Severity reported by the source, if it classifies on its own.
    #[serde(default)]
    pub severity: Option<Severity>,
}

impl WeatherConditions {
    pub fn new(wind_speed_kn: f64, wave_height_m: f64) -> Self {
        Self {
            wind_speed_kn,
            wave_height_m,
            severity: None,
        }
    }

    /// Source-provided severity, or the local wind/wave classification.
    pub fn effective_severity(&self) -> Severity {
        self.severity
            .unwrap_or_else(|| classify(self.wind_speed_kn, self.wave_height_m))
    }

    /// Storm when wind is the dominant factor, high swell when waves are.
    pub fn kind(&self) -> HazardKind {
        let wind_ratio = self.wind_speed_kn / GALE_WIND_KN;
        let wave_ratio = self.wave_height_m / ROUGH_WAVE_M;
        if wind_ratio >= wave_ratio {
            HazardKind::Storm
        } else {
            HazardKind::HighSwell
        }
    }
}

const MODERATE_WIND_KN: f64 = 22.0;
const GALE_WIND_KN: f64 = 34.0;
const MODERATE_WAVE_M: f64 = 2.5;
const ROUGH_WAVE_M: f64 = 4.0;

/// Classify a sea state: moderate from a strong breeze or 2.5 m seas, severe from gale force or 4 m seas.
pub fn classify(wind_speed_kn: f64, wave_height_m: f64) -> Severity {
    let wind = if wind_speed_kn.is_finite() { wind_speed_kn } else { 0.0 };
    let wave = if wave_height_m.is_finite() { wave_height_m } else { 0.0 };
    if wind >= GALE_WIND_KN || wave >= ROUGH_WAVE_M {
        Severity::Severe
    } else if wind >= MODERATE_WIND_KN || wave >= MODERATE_WAVE_M {
        Severity::Moderate
    } else {
        Severity::Normal
    }
}

/// External weather data source, sampled per corridor point.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn conditions(&self, point: GeoPoint) -> Result<WeatherConditions, UpstreamError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardConfig {
    pub sample_count: usize,
    pub sample_timeout: Duration,
    pub moderate_radius_nm: f64,
    pub severe_radius_nm: f64,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            sample_count: 5,
            sample_timeout: Duration::from_secs(5),
            moderate_radius_nm: 20.0,
            severe_radius_nm: 30.0,
        }
    }
}

impl HazardConfig {
    fn radius_for(&self, severity: Severity) -> Option<f64> {
        match severity {
            Severity::Normal => None,
            Severity::Moderate => Some(self.moderate_radius_nm),
            Severity::Severe => Some(self.severe_radius_nm),
        }
    }
}

/// Result of a corridor query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorridorHazards {
    pub zones: Vec<HazardZone>,
    /// False when no sample could be fetched (no source, or every sample failed).
    pub source_available: bool,
    pub samples: usize,
    pub failed_samples: usize,
}

#[derive(Clone)]
pub struct HazardZoneService {
    source: Option<Arc<dyn WeatherSource>>,
    config: HazardConfig,
}

impl HazardZoneService {
    pub fn new(source: Option<Arc<dyn WeatherSource>>, config: HazardConfig) -> Self {
        Self { source, config }
    }

    /// Service with no weather source; every query reports the source unavailable.
    pub fn offline() -> Self {
        Self::new(None, HazardConfig::default())
    }

    pub fn config(&self) -> &HazardConfig {
        &self.config
    }

    /// Query weather at `sample_count` (min 2) points between the endpoints.
    pub async fn hazards_along_corridor(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        sample_count: usize,
    ) -> CorridorHazards {
        let samples = sample_great_circle(origin, destination, sample_count);
        let Some(source) = self.source.as_ref() else {
            tracing::debug!("no weather source configured");
            return CorridorHazards {
                zones: Vec::new(),
                source_available: false,
                samples: samples.len(),
                failed_samples: samples.len(),
            };
        };

        let timeout = self.config.sample_timeout;
        let mut tasks = JoinSet::new();
        for (idx, point) in samples.iter().copied().enumerate() {
            let source = Arc::clone(source);
            tasks.spawn(async move {
                let result = tokio::time::timeout(timeout, source.conditions(point))
                    .await
                    .unwrap_or(Err(UpstreamError::Timeout));
                (idx, point, result)
            });
        }

        let mut fetched = Vec::with_capacity(samples.len());
        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((idx, point, Ok(conditions))) => fetched.push((idx, point, conditions)),
                Ok((idx, _, Err(err))) => {
                    tracing::warn!(sample = idx, "weather sample skipped: {}", err);
                    failed += 1;
                }
                Err(err) => {
                    tracing::warn!("weather sample task failed: {}", err);
                    failed += 1;
                }
            }
        }
        fetched.sort_by_key(|(idx, _, _)| *idx);

        let zones: Vec<HazardZone> = fetched
            .iter()
            .filter_map(|(_, point, conditions)| {
                let severity = conditions.effective_severity();
                let radius_nm = self.config.radius_for(severity)?;
                Some(HazardZone::new(*point, radius_nm, severity, conditions.kind()))
            })
            .collect();

        if fetched.is_empty() {
            tracing::warn!(samples = samples.len(), "weather source unavailable for corridor");
        } else {
            tracing::debug!(
                samples = samples.len(),
                failed,
                zones = zones.len(),
                "corridor weather sampled"
            );
        }

        CorridorHazards {
            source_available: !fetched.is_empty(),
            zones,
            samples: samples.len(),
            failed_samples: failed,
        }
    }
}

/// Demo-only hazard zones for when the weather source is down.
///
/// Deterministic for a given pair of endpoints. Zones never cover either endpoint.
pub fn synthetic_hazards(origin: GeoPoint, destination: GeoPoint) -> Vec<HazardZone> {
    let corridor_nm = distance_nm(origin, destination);
    if corridor_nm < 10.0 {
        return Vec::new();
    }

    let seed = [origin.lat, origin.lon, destination.lat, destination.lon]
        .iter()
        .fold(0xcbf2_9ce4_8422_2325_u64, |acc, value| {
            (acc ^ ((value * 1e4).round() as i64 as u64)).wrapping_mul(0x0100_0000_01b3)
        });
    let mut rng = StdRng::seed_from_u64(seed);
    let heading = bearing_deg(origin, destination);
    let count = rng.random_range(1..=2);

    let mut zones = Vec::with_capacity(count);
    for _ in 0..count {
        let along = interpolate(origin, destination, rng.random_range(0.3..0.7));
        let lateral = rng.random_range(-0.15..0.15) * corridor_nm;
        let side = if lateral >= 0.0 { 90.0 } else { -90.0 };
        let center = offset_by_bearing(along, lateral.abs(), heading + side);

        let clearance = distance_nm(center, origin).min(distance_nm(center, destination)) - 2.0;
        let radius_nm = rng.random_range(8.0..18.0_f64).min(clearance);
        if radius_nm < 3.0 {
            continue;
        }

        let severity = if rng.random_bool(0.5) {
            Severity::Severe
        } else {
            Severity::Moderate
        };
        let kind = if rng.random_bool(0.5) {
            HazardKind::Storm
        } else {
            HazardKind::HighSwell
        };
        zones.push(HazardZone::new(center, radius_nm, severity, kind));
    }
    zones
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedWeather(WeatherConditions);

    #[async_trait]
    impl WeatherSource for FixedWeather {
        async fn conditions(&self, _point: GeoPoint) -> Result<WeatherConditions, UpstreamError> {
            Ok(self.0)
        }
    }

    /// Fails every other call.
    struct FlakyWeather(AtomicUsize);

    #[async_trait]
    impl WeatherSource for FlakyWeather {
        async fn conditions(&self, _point: GeoPoint) -> Result<WeatherConditions, UpstreamError> {
            if self.0.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(UpstreamError::Unavailable("flaky".into()))
            } else {
                Ok(WeatherConditions::new(40.0, 5.0))
            }
        }
    }

    struct DownWeather;

    #[async_trait]
    impl WeatherSource for DownWeather {
        async fn conditions(&self, _point: GeoPoint) -> Result<WeatherConditions, UpstreamError> {
            Err(UpstreamError::Http(503))
        }
    }

    struct SlowWeather;

    #[async_trait]
    impl WeatherSource for SlowWeather {
        async fn conditions(&self, _point: GeoPoint) -> Result<WeatherConditions, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(WeatherConditions::new(50.0, 6.0))
        }
    }

    fn abu_dhabi() -> GeoPoint {
        GeoPoint::new(24.4539, 54.3773)
    }

    fn dubai() -> GeoPoint {
        GeoPoint::new(25.2697, 55.3095)
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify(10.0, 1.0), Severity::Normal);
        assert_eq!(classify(25.0, 1.0), Severity::Moderate);
        assert_eq!(classify(10.0, 3.0), Severity::Moderate);
        assert_eq!(classify(35.0, 1.0), Severity::Severe);
        assert_eq!(classify(5.0, 4.5), Severity::Severe);
        assert_eq!(classify(f64::NAN, f64::NAN), Severity::Normal);
    }

    #[test]
    fn source_severity_overrides_classification() {
        let mut conditions = WeatherConditions::new(5.0, 0.5);
        conditions.severity = Some(Severity::Severe);
        assert_eq!(conditions.effective_severity(), Severity::Severe);
        assert_eq!(WeatherConditions::new(40.0, 1.0).kind(), HazardKind::Storm);
        assert_eq!(WeatherConditions::new(10.0, 5.0).kind(), HazardKind::HighSwell);
    }

    #[tokio::test]
    async fn calm_weather_yields_no_zones() {
        let service = HazardZoneService::new(
            Some(Arc::new(FixedWeather(WeatherConditions::new(8.0, 0.8)))),
            HazardConfig::default(),
        );
        let result = service.hazards_along_corridor(abu_dhabi(), dubai(), 5).await;
        assert!(result.source_available);
        assert!(result.zones.is_empty());
        assert_eq!(result.samples, 5);
    }

    #[tokio::test]
    async fn severe_weather_yields_one_zone_per_sample() {
        let service = HazardZoneService::new(
            Some(Arc::new(FixedWeather(WeatherConditions::new(45.0, 6.0)))),
            HazardConfig::default(),
        );
        let result = service.hazards_along_corridor(abu_dhabi(), dubai(), 3).await;
        assert_eq!(result.zones.len(), 3);
        assert!(result.zones.iter().all(HazardZone::is_severe));
        // Zones come back in corridor order.
        assert_eq!(result.zones[0].center, abu_dhabi());
    }

    #[tokio::test]
    async fn failed_samples_are_skipped_not_fatal() {
        let service = HazardZoneService::new(
            Some(Arc::new(FlakyWeather(AtomicUsize::new(0)))),
            HazardConfig::default(),
        );
        let result = service.hazards_along_corridor(abu_dhabi(), dubai(), 4).await;
        assert!(result.source_available);
        assert_eq!(result.failed_samples, 2);
        assert_eq!(result.zones.len(), 2);
    }

    #[tokio::test]
    async fn dead_or_missing_source_reports_unavailable() {
        let down = HazardZoneService::new(Some(Arc::new(DownWeather)), HazardConfig::default());
        let result = down.hazards_along_corridor(abu_dhabi(), dubai(), 5).await;
        assert!(!result.source_available);
        assert!(result.zones.is_empty());

        let offline = HazardZoneService::offline();
        let result = offline.hazards_along_corridor(abu_dhabi(), dubai(), 1).await;
        assert!(!result.source_available);
        assert_eq!(result.samples, 2);
    }

    #[tokio::test]
    async fn slow_source_times_out_as_unavailable() {
        let config = HazardConfig {
            sample_timeout: Duration::from_millis(20),
            ..HazardConfig::default()
        };
        let service = HazardZoneService::new(Some(Arc::new(SlowWeather)), config);
        let result = service.hazards_along_corridor(abu_dhabi(), dubai(), 2).await;
        assert!(!result.source_available);
        assert_eq!(result.failed_samples, 2);
    }

    #[test]
    fn synthetic_zones_are_deterministic_and_clear_endpoints() {
        let first = synthetic_hazards(abu_dhabi(), dubai());
        let second = synthetic_hazards(abu_dhabi(), dubai());
        assert_eq!(first, second);
        for zone in &first {
            assert!(distance_nm(zone.center, abu_dhabi()) > zone.radius_nm);
            assert!(distance_nm(zone.center, dubai()) > zone.radius_nm);
        }
        assert!(synthetic_hazards(dubai(), dubai()).is_empty());
    }
}
