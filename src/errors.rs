//! Error types for the voyage wave simulator.
//! Route and parameter errors abort a voyage before it starts, environment fetch errors never leave the environment provider.
//! Author: G0rocks
//! Date: 2025-06-12

use thiserror::Error;

/// Errors that stop a voyage from being set up, run or exported
#[derive(Debug, Error)]
pub enum VoyageError {
    /// A route needs at least two waypoints to have a single segment
    #[error("invalid route: at least 2 waypoints are needed, got {waypoints}")]
    InvalidRoute { waypoints: usize },
    /// Waypoint with a latitude outside [-90, 90], longitude outside [-180, 360] or a non-finite value
    #[error("invalid waypoint {index}: latitude {latitude}, longitude {longitude}")]
    InvalidWaypoint { index: usize, latitude: f64, longitude: f64 },
    #[error("{field} must be a positive finite number (got {value})")]
    InvalidParameter { field: &'static str, value: f64 },
    #[error("voyage needs {steps} steps which is more than the maximum of {max}")]
    TooManySteps { steps: f64, max: usize },
    #[error("timestamp out of range {hours} hours after the voyage start")]
    TimestampOutOfRange { hours: f64 },
    #[error("no voyage records to evaluate")]
    EmptyRecords,
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid voyage config: {0}")]
    Config(#[from] serde_json::Error),
}

/// Reasons a single wave height query against the marine data service failed
#[derive(Debug, Error)]
pub enum EnvironmentFetchError {
    /// Timeout, connection failure or an error status from the service
    #[error("marine data request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed marine data response: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("marine data response has no entry for hour {hour} (got {len} hourly values)")]
    HourOutOfRange { hour: u8, len: usize },
    #[error("marine data response holds an invalid wave height: {0}")]
    InvalidValue(f64),
    /// Any other reason the data source could not deliver, used by sources that are not HTTP based
    #[error("marine data unavailable: {0}")]
    Unavailable(String),
}
