use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

use seafleet_core::{GeoPoint, ProviderPoint, RouteProvider, UpstreamError};

use super::{read_json, upstream_error};
use crate::backoff::Backoff;

/// Providers answer either with a bare point list or wrapped in `waypoints`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RoutePayload {
    Points(Vec<ProviderPoint>),
    Wrapped { waypoints: Vec<ProviderPoint> },
}

impl RoutePayload {
    fn into_points(self) -> Vec<ProviderPoint> {
        match self {
            RoutePayload::Points(points) | RoutePayload::Wrapped { waypoints: points } => points,
        }
    }
}

/// Maritime routing provider reached over HTTP.
///
/// `GET {base_url}/route?origin_lat=..&origin_lon=..&destination_lat=..&destination_lon=..`
pub struct HttpRouteProvider {
    client: Client,
    base_url: String,
    backoff: Mutex<Backoff>,
}

impl HttpRouteProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            backoff: Mutex::new(Backoff::new(Duration::from_secs(5), Duration::from_secs(300))),
        })
    }

    fn with_backoff<T>(&self, f: impl FnOnce(&mut Backoff) -> T) -> T {
        match self.backoff.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    async fn fetch(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<ProviderPoint>, UpstreamError> {
        let response = self
            .client
            .get(format!("{}/route", self.base_url))
            .query(&[
                ("origin_lat", origin.lat.to_string()),
                ("origin_lon", origin.lon.to_string()),
                ("destination_lat", destination.lat.to_string()),
                ("destination_lon", destination.lon.to_string()),
            ])
            .send()
            .await
            .map_err(upstream_error)?;
        let payload: RoutePayload = read_json(response).await?;
        Ok(payload.into_points())
    }
}

#[async_trait]
impl RouteProvider for HttpRouteProvider {
    async fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<Vec<ProviderPoint>, UpstreamError> {
        let (ready, remaining) = self.with_backoff(|backoff| (backoff.ready(), backoff.remaining()));
        if !ready {
            return Err(UpstreamError::Unavailable(format!(
                "backing off for {}s after failures",
                remaining.as_secs()
            )));
        }

        match self.fetch(origin, destination).await {
            Ok(points) => {
                self.with_backoff(Backoff::reset);
                Ok(points)
            }
            Err(err) => {
                let delay = self.with_backoff(Backoff::fail);
                tracing::warn!(
                    "routing provider failed ({}), skipping it for {:?}",
                    err,
                    delay
                );
                Err(err)
            }
        }
    }
}
