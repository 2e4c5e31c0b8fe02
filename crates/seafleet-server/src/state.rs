//! Shared application state: the loaded network and the engines built on it.

use anyhow::{Context, Result};
use std::sync::Arc;

use seafleet_core::{
    HazardZoneService, OptimizerConfig, SeaRouteEngine, VoyageConfig, WaypointNetwork,
};

use crate::config::Config;
use crate::providers::{HttpRouteProvider, OpenMeteoWeather};

pub struct AppState {
    config: Config,
    network: Arc<WaypointNetwork>,
    engine: SeaRouteEngine,
}

impl AppState {
    /// Build the Gulf network once and wire the configured upstream clients.
    pub fn new(config: Config) -> Result<Self> {
        let network = Arc::new(
            WaypointNetwork::arabian_gulf().context("failed to build the Gulf waypoint network")?,
        );
        Self::with_network(config, network)
    }

    pub fn with_network(config: Config, network: Arc<WaypointNetwork>) -> Result<Self> {
        let hazards = match config.weather_url.as_deref() {
            Some(marine_url) => {
                let weather = OpenMeteoWeather::new(
                    marine_url,
                    config.wind_url.clone(),
                    config.weather_timeout,
                    config.weather_cache_ttl,
                )
                .context("failed to build weather client")?;
                HazardZoneService::new(Some(Arc::new(weather)), config.hazard_config())
            }
            None => {
                tracing::info!("live weather disabled");
                HazardZoneService::new(None, config.hazard_config())
            }
        };

        let mut engine = SeaRouteEngine::new(Arc::clone(&network), config.route_config())
            .with_hazard_service(hazards);
        match config.routing_provider_url.as_deref() {
            Some(url) => {
                let provider = HttpRouteProvider::new(url, config.routing_timeout)
                    .context("failed to build routing provider client")?;
                engine = engine.with_provider(Arc::new(provider));
                tracing::info!("routing provider at {}", url);
            }
            None => tracing::info!("routing provider disabled, using the waypoint network"),
        }

        tracing::info!(
            nodes = network.nodes().len(),
            edges = network.edge_count(),
            landmasses = network.landmasses().len(),
            "waypoint network loaded"
        );

        Ok(Self {
            config,
            network,
            engine,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn network(&self) -> &WaypointNetwork {
        &self.network
    }

    pub fn engine(&self) -> &SeaRouteEngine {
        &self.engine
    }

    pub fn voyage_config(&self) -> VoyageConfig {
        self.config.voyage_config()
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        self.config.optimizer_config()
    }
}
