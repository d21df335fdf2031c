//! Weather-station metadata fetch and fusion.
//!
//! Pulls station lists from a rate-limited, OAuth2-protected API across
//! every time-scale and region, persists each partition, and fuses them
//! into one canonical record per station.

pub mod api;
pub mod auth;
pub mod config;
pub mod pipeline;
pub mod stations;
