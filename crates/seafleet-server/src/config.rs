//! Server configuration from environment.

use std::env;
use std::time::Duration;

use seafleet_core::{HazardConfig, OptimizerConfig, SeaRouteConfig, VoyageConfig};

const DEFAULT_WEATHER_URL: &str = "https://marine-api.open-meteo.com/v1/marine";
const DEFAULT_WIND_URL: &str = "https://api.open-meteo.com/v1/forecast";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    /// Maritime routing provider base URL. `None` disables the provider.
    pub routing_provider_url: Option<String>,
    pub routing_timeout: Duration,
    /// Marine (wave height) endpoint. `None` disables live weather.
    pub weather_url: Option<String>,
    pub wind_url: String,
    pub weather_timeout: Duration,
    pub weather_cache_ttl: Duration,
    pub hazard_samples: usize,
    pub synthetic_hazards: bool,
    pub fuel_price_usd_per_liter: f64,
    pub default_speed_knots: f64,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 3000,
            routing_provider_url: None,
            routing_timeout: Duration::from_secs(8),
            weather_url: Some(DEFAULT_WEATHER_URL.to_string()),
            wind_url: DEFAULT_WIND_URL.to_string(),
            weather_timeout: Duration::from_secs(5),
            weather_cache_ttl: Duration::from_secs(600),
            hazard_samples: 5,
            synthetic_hazards: true,
            fuel_price_usd_per_liter: 0.85,
            default_speed_knots: 10.0,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server_port: parsed("SEAFLEET_PORT").unwrap_or(defaults.server_port),
            routing_provider_url: optional_url("SEAFLEET_ROUTING_PROVIDER_URL")
                .unwrap_or(defaults.routing_provider_url),
            routing_timeout: parsed("SEAFLEET_ROUTING_TIMEOUT_S")
                .map(Duration::from_secs)
                .unwrap_or(defaults.routing_timeout),
            weather_url: optional_url("SEAFLEET_WEATHER_URL").unwrap_or(defaults.weather_url),
            wind_url: env::var("SEAFLEET_WIND_URL").unwrap_or(defaults.wind_url),
            weather_timeout: parsed("SEAFLEET_WEATHER_TIMEOUT_S")
                .map(Duration::from_secs)
                .unwrap_or(defaults.weather_timeout),
            weather_cache_ttl: parsed("SEAFLEET_WEATHER_CACHE_TTL_S")
                .map(Duration::from_secs)
                .unwrap_or(defaults.weather_cache_ttl),
            hazard_samples: parsed::<usize>("SEAFLEET_HAZARD_SAMPLES")
                .map(|count| count.max(2))
                .unwrap_or(defaults.hazard_samples),
            synthetic_hazards: env::var("SEAFLEET_SYNTHETIC_HAZARDS")
                .ok()
                .and_then(|value| parse_bool(&value))
                .unwrap_or(defaults.synthetic_hazards),
            fuel_price_usd_per_liter: parsed::<f64>("SEAFLEET_FUEL_PRICE_USD_PER_L")
                .filter(|price| price.is_finite() && *price >= 0.0)
                .unwrap_or(defaults.fuel_price_usd_per_liter),
            default_speed_knots: parsed::<f64>("SEAFLEET_DEFAULT_SPEED_KN")
                .filter(|speed| speed.is_finite() && *speed > 0.0)
                .unwrap_or(defaults.default_speed_knots),
            log_format: match env::var("SEAFLEET_LOG_FORMAT") {
                Ok(value) if value.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }

    /// Config with both upstream collaborators disabled.
    pub fn offline() -> Self {
        Self {
            routing_provider_url: None,
            weather_url: None,
            ..Self::default()
        }
    }

    pub fn route_config(&self) -> SeaRouteConfig {
        SeaRouteConfig {
            provider_timeout: self.routing_timeout,
            synthetic_hazards: self.synthetic_hazards,
            ..SeaRouteConfig::default()
        }
    }

    pub fn hazard_config(&self) -> HazardConfig {
        HazardConfig {
            sample_count: self.hazard_samples,
            sample_timeout: self.weather_timeout,
            ..HazardConfig::default()
        }
    }

    pub fn voyage_config(&self) -> VoyageConfig {
        VoyageConfig {
            fuel_price_usd_per_liter: self.fuel_price_usd_per_liter,
            default_speed_knots: self.default_speed_knots,
        }
    }

    pub fn optimizer_config(&self) -> OptimizerConfig {
        OptimizerConfig {
            as_of: None,
            fuel_price_usd_per_liter: self.fuel_price_usd_per_liter,
        }
    }
}

fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// `Some(None)` when the variable is set but empty, which disables the endpoint.
fn optional_url(key: &str) -> Option<Option<String>> {
    env::var(key).ok().map(|value| {
        let trimmed = value.trim().trim_end_matches('/');
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_flags_accept_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn derived_configs_carry_overrides() {
        let config = Config {
            hazard_samples: 7,
            fuel_price_usd_per_liter: 1.1,
            synthetic_hazards: false,
            ..Config::offline()
        };
        assert_eq!(config.hazard_config().sample_count, 7);
        assert_eq!(config.voyage_config().fuel_price_usd_per_liter, 1.1);
        assert_eq!(config.optimizer_config().fuel_price_usd_per_liter, 1.1);
        assert!(!config.route_config().synthetic_hazards);
        assert!(config.weather_url.is_none());
    }
}
