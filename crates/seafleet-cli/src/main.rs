use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;

use seafleet_cli::{render, SeafleetClient};
use seafleet_core::GeoPoint;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seafleet Server URL
    #[arg(long, default_value = "http://localhost:3000")]
    url: String,

    /// Print the raw JSON response
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Optimized vs. direct route for one vessel
    Route {
        /// Origin as "lat,lon"
        #[arg(long, value_parser = parse_point)]
        origin: GeoPoint,
        /// Destination as "lat,lon"
        #[arg(long, value_parser = parse_point)]
        destination: GeoPoint,
        #[arg(long)]
        origin_name: Option<String>,
        #[arg(long)]
        destination_name: Option<String>,
        #[arg(long, default_value = "vessel-1")]
        vessel_id: String,
        #[arg(long, default_value = "supply")]
        vessel_type: String,
        /// Cruise speed in knots (class default when omitted)
        #[arg(long)]
        speed: Option<f64>,
        /// time, fuel, safety or balanced
        #[arg(long, default_value = "balanced")]
        prioritize: String,
    },
    /// Assign vessels to projects from a scenario file
    Optimize {
        /// JSON file with `vessels`, `projects` and optional `assignments`
        #[arg(long)]
        file: PathBuf,
    },
    /// List the waypoint network loaded by the server
    Network,
}

fn parse_point(value: &str) -> Result<GeoPoint, String> {
    let (lat, lon) = value
        .split_once(',')
        .ok_or_else(|| format!("expected \"lat,lon\", got {value:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|_| format!("bad latitude {lat:?}"))?;
    let lon: f64 = lon.trim().parse().map_err(|_| format!("bad longitude {lon:?}"))?;
    Ok(GeoPoint::new(lat, lon))
}

fn endpoint(point: GeoPoint, name: Option<String>) -> Value {
    json!({ "lat": point.lat, "lng": point.lon, "name": name })
}

fn main() -> Result<()> {
    let args = Args::parse();
    let client = SeafleetClient::new(args.url)?;

    match args.command {
        Command::Route {
            origin,
            destination,
            origin_name,
            destination_name,
            vessel_id,
            vessel_type,
            speed,
            prioritize,
        } => {
            let request = json!({
                "vessel": {
                    "id": vessel_id,
                    "name": vessel_id,
                    "type": vessel_type,
                    "position": { "lat": origin.lat, "lng": origin.lon },
                    "speed": speed,
                },
                "origin": endpoint(origin, origin_name),
                "destination": endpoint(destination, destination_name),
                "preferences": { "prioritize": prioritize },
            });
            let plan = client.optimize_route(&request)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            } else {
                print!("{}", render::voyage_plan(&plan));
            }
        }
        Command::Optimize { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let scenario: Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            if !scenario.is_object() {
                return Err(anyhow!("{} must contain a JSON object", file.display()));
            }
            let result = client.optimize_fleet(&scenario)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render::optimization(&result));
            }
        }
        Command::Network => {
            let network = client.network()?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&network)?);
            } else {
                print!("{}", render::network(&network));
            }
        }
    }

    Ok(())
}
