//! Shared library surface for the seafleet server and its tests.

pub mod api;
pub mod backoff;
pub mod cache;
pub mod config;
pub mod providers;
pub mod state;
