//! Blocking HTTP client for the seafleet server.

use anyhow::{bail, Context, Result};
use reqwest::blocking::{Client, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use seafleet_core::OptimizationResult;

pub struct SeafleetClient {
    client: Client,
    base_url: String,
}

impl SeafleetClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `POST /v1/routes/optimize`; the plan is returned as raw JSON.
    pub fn optimize_route<T: Serialize>(&self, request: &T) -> Result<Value> {
        let response = self
            .client
            .post(self.url("/v1/routes/optimize"))
            .json(request)
            .send()
            .context("route request failed")?;
        read_json(response)
    }

    pub fn optimize_fleet(&self, request: &Value) -> Result<OptimizationResult> {
        let response = self
            .client
            .post(self.url("/v1/fleet/optimize"))
            .json(request)
            .send()
            .context("fleet request failed")?;
        let body = read_json(response)?;
        serde_json::from_value(body).context("unexpected optimization response")
    }

    pub fn network(&self) -> Result<Value> {
        let response = self
            .client
            .get(self.url("/v1/network"))
            .send()
            .context("network request failed")?;
        read_json(response)
    }
}

fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    let body: Value = response.json().context("response was not JSON")?;
    if !status.is_success() {
        let kind = body["error"].as_str().unwrap_or("Error");
        let message = body["message"].as_str().unwrap_or("no message");
        bail!("server returned {} ({}): {}", status.as_u16(), kind, message);
    }
    Ok(body)
}
