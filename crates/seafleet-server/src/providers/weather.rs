use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use seafleet_core::{GeoPoint, UpstreamError, WeatherConditions, WeatherSource};

use super::{read_json, upstream_error};
use crate::cache::WeatherCache;

const CACHE_MAX_ENTRIES: usize = 2_048;

#[derive(Debug, Deserialize)]
struct MarineResponse {
    current: Option<MarineCurrent>,
}

#[derive(Debug, Deserialize)]
struct MarineCurrent {
    wave_height: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<ForecastCurrent>,
}

#[derive(Debug, Deserialize)]
struct ForecastCurrent {
    wind_speed_10m: Option<f64>,
}

/// Open-Meteo marine (wave height) and forecast (wind) endpoints.
///
/// A sample succeeds when at least one of the two answers; the missing
/// reading is taken as calm.
pub struct OpenMeteoWeather {
    client: Client,
    marine_url: String,
    wind_url: String,
    cache: WeatherCache,
}

impl OpenMeteoWeather {
    pub fn new(
        marine_url: impl Into<String>,
        wind_url: impl Into<String>,
        timeout: Duration,
        cache_ttl: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            marine_url: marine_url.into(),
            wind_url: wind_url.into(),
            cache: WeatherCache::new(cache_ttl, CACHE_MAX_ENTRIES),
        })
    }

    async fn wave_height(&self, point: GeoPoint) -> Result<f64, UpstreamError> {
        let response = self
            .client
            .get(&self.marine_url)
            .query(&[
                ("latitude", point.lat.to_string()),
                ("longitude", point.lon.to_string()),
                ("current", "wave_height".to_string()),
            ])
            .send()
            .await
            .map_err(upstream_error)?;
        let payload: MarineResponse = read_json(response).await?;
        payload
            .current
            .and_then(|current| current.wave_height)
            .ok_or_else(|| UpstreamError::Malformed("marine response missing wave_height".into()))
    }

    async fn wind_speed(&self, point: GeoPoint) -> Result<f64, UpstreamError> {
        let response = self
            .client
            .get(&self.wind_url)
            .query(&[
                ("latitude", point.lat.to_string()),
                ("longitude", point.lon.to_string()),
                ("current", "wind_speed_10m".to_string()),
                ("wind_speed_unit", "kn".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()
            .await
            .map_err(upstream_error)?;
        let payload: ForecastResponse = read_json(response).await?;
        payload
            .current
            .and_then(|current| current.wind_speed_10m)
            .ok_or_else(|| UpstreamError::Malformed("forecast response missing wind_speed_10m".into()))
    }
}

fn combine(
    wind: Result<f64, UpstreamError>,
    waves: Result<f64, UpstreamError>,
) -> Result<WeatherConditions, UpstreamError> {
    match (wind, waves) {
        (Ok(wind), Ok(waves)) => Ok(WeatherConditions::new(wind, waves)),
        (Ok(wind), Err(err)) => {
            tracing::debug!("wave height unavailable, assuming calm sea: {}", err);
            Ok(WeatherConditions::new(wind, 0.0))
        }
        (Err(err), Ok(waves)) => {
            tracing::debug!("wind unavailable, assuming calm air: {}", err);
            Ok(WeatherConditions::new(0.0, waves))
        }
        (Err(err), Err(_)) => Err(err),
    }
}

#[async_trait]
impl WeatherSource for OpenMeteoWeather {
    async fn conditions(&self, point: GeoPoint) -> Result<WeatherConditions, UpstreamError> {
        if let Some(cached) = self.cache.get(point) {
            return Ok(cached);
        }
        let (wind, waves) = tokio::join!(self.wind_speed(point), self.wave_height(point));
        let conditions = combine(wind, waves)?;
        self.cache.insert(point, conditions);
        Ok(conditions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_missing_reading_is_taken_as_calm() {
        let conditions = combine(Ok(40.0), Err(UpstreamError::Timeout)).unwrap();
        assert_eq!(conditions.wave_height_m, 0.0);
        assert_eq!(conditions.wind_speed_kn, 40.0);

        let failed = combine(Err(UpstreamError::Http(503)), Err(UpstreamError::Timeout));
        assert_eq!(failed, Err(UpstreamError::Http(503)));
    }

    #[test]
    fn open_meteo_payloads_parse() {
        let marine: MarineResponse =
            serde_json::from_str(r#"{"latitude": 25.0, "current": {"time": "2026-05-01T00:00", "wave_height": 1.42}}"#)
                .unwrap();
        assert_eq!(marine.current.and_then(|c| c.wave_height), Some(1.42));

        let forecast: ForecastResponse =
            serde_json::from_str(r#"{"current": {"wind_speed_10m": 18.3}}"#).unwrap();
        assert_eq!(forecast.current.and_then(|c| c.wind_speed_10m), Some(18.3));
    }

    #[tokio::test]
    async fn unreachable_endpoints_fail_the_sample() {
        let weather = OpenMeteoWeather::new(
            "http://127.0.0.1:9/marine",
            "http://127.0.0.1:9/forecast",
            Duration::from_millis(500),
            Duration::from_secs(60),
        )
        .unwrap();
        assert!(weather.conditions(GeoPoint::new(25.0, 55.0)).await.is_err());
    }
}
