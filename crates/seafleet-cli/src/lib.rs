//! Seafleet CLI - command line client for the seafleet server.
//!
//! - `seafleet route`: optimized vs. direct route for one vessel
//! - `seafleet optimize --file scenario.json`: fleet assignment
//! - `seafleet network`: the loaded waypoint network

pub mod client;
pub mod render;

pub use client::SeafleetClient;
