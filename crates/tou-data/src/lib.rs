//! Data layer for the time-of-use analyzer.
//!
//! Reads utility interval exports and home-gateway daily files, prices
//! interval records under each rate plan, accumulates directional gateway
//! flows and runs the top-level analysis pipelines.

pub mod aggregator;
pub mod analysis;
pub mod flow;
pub mod reader;

pub use tou_core as core;
