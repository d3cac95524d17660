//! Domain core for the time-of-use analyzer.
//!
//! Timestamp normalisation, the rate-plan table, the TOU classifier, error
//! types and command-line settings shared by the data and binary crates.

pub mod classifier;
pub mod error;
pub mod formatting;
pub mod models;
pub mod plans;
pub mod settings;
pub mod time_utils;

pub use error::{Result, TouError};
