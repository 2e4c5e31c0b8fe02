//! HTTP clients for the upstream collaborators: maritime routing provider and weather.

mod routing;
mod weather;

pub use routing::HttpRouteProvider;
pub use weather::OpenMeteoWeather;

use seafleet_core::UpstreamError;

fn upstream_error(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout
    } else if let Some(status) = err.status() {
        UpstreamError::Http(status.as_u16())
    } else if err.is_decode() {
        UpstreamError::Malformed(err.to_string())
    } else {
        UpstreamError::Unavailable(err.to_string())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, UpstreamError> {
    let status = response.status();
    if !status.is_success() {
        return Err(UpstreamError::Http(status.as_u16()));
    }
    response.json::<T>().await.map_err(|err| {
        if err.is_decode() {
            UpstreamError::Malformed(err.to_string())
        } else {
            upstream_error(err)
        }
    })
}
