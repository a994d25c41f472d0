//! Configuration of a voyage for the voyage wave simulator.
//! Read from JSON, every field has a default so an empty object is a valid config.
//! Author: G0rocks
//! Date: 2025-06-13

use crate::*;   // To use everything from the crate
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Everything needed to set up and run a voyage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoyageConfig {
    /// Waypoints as [latitude, longitude] in decimal degrees
    #[serde(default = "VoyageConfig::default_route")]
    pub route: Vec<[f64; 2]>,
    /// Nominal speed in [kn]
    #[serde(default = "VoyageConfig::default_speed_knots")]
    pub speed_knots: f64,
    /// Time step in [h]
    #[serde(default = "VoyageConfig::default_time_step_hours")]
    pub time_step_hours: f64,
    /// UTC start time as "YYYY-MM-DD hh:mm"
    #[serde(default = "VoyageConfig::default_start_time")]
    pub start_time: String,
    /// Seed for the speed jitter, random if not set
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "VoyageConfig::default_speed_jitter_fraction")]
    pub speed_jitter_fraction: f64,
    #[serde(default = "VoyageConfig::default_max_steps")]
    pub max_steps: usize,
    #[serde(default)]
    pub environment: EnvironmentConfig,
}

impl Default for VoyageConfig {
    fn default() -> Self {
        VoyageConfig {
            route: Self::default_route(),
            speed_knots: Self::default_speed_knots(),
            time_step_hours: Self::default_time_step_hours(),
            start_time: Self::default_start_time(),
            seed: None,
            speed_jitter_fraction: Self::default_speed_jitter_fraction(),
            max_steps: Self::default_max_steps(),
            environment: EnvironmentConfig::default(),
        }
    }
}

impl VoyageConfig {
    /// Mumbai to Chennai along the Indian west coast and around Sri Lanka
    fn default_route() -> Vec<[f64; 2]> {
        vec![
            [19.0, 72.4],   // Mumbai
            [12.9, 74.8],   // New Mangalore
            [9.3, 75.2],    // Kochi
            [5.8, 80.1],    // Galle
            [5.6, 81.5],
            [7.0, 82.3],
            [13.09, 80.28], // Chennai
        ]
    }

    const fn default_speed_knots() -> f64 {
        14.0
    }

    const fn default_time_step_hours() -> f64 {
        1.0
    }

    fn default_start_time() -> String {
        "2024-01-01 00:00".to_string()
    }

    const fn default_speed_jitter_fraction() -> f64 {
        DEFAULT_SPEED_JITTER_FRACTION
    }

    const fn default_max_steps() -> usize {
        DEFAULT_MAX_STEPS
    }

    pub fn from_json_str(json: &str) -> Result<VoyageConfig, VoyageError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<VoyageConfig, VoyageError> {
        let json = std::fs::read_to_string(path)?;
        return VoyageConfig::from_json_str(&json);
    }

    pub fn route(&self) -> Result<Route, VoyageError> {
        let coordinates: Vec<(f64, f64)> = self.route.iter().map(|[lat, lon]| (*lat, *lon)).collect();
        return Route::from_lat_lon(&coordinates);
    }

    pub fn start_time(&self) -> Result<time::UtcDateTime, VoyageError> {
        string_to_utc_date_time(&self.start_time)
    }

    /// Voyage parameters, validated
    pub fn parameters(&self) -> Result<VoyageParameters, VoyageError> {
        let parameters = VoyageParameters::new(self.speed_knots, self.time_step_hours, self.start_time()?)
            .with_speed_jitter(self.speed_jitter_fraction)
            .with_max_steps(self.max_steps);
        parameters.validate()?;
        return Ok(parameters);
    }
}


/// Settings of the marine weather lookups
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default = "EnvironmentConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "EnvironmentConfig::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Pause after every network fetch, 0 turns it off
    #[serde(default = "EnvironmentConfig::default_request_pacing_ms")]
    pub request_pacing_ms: u64,
    /// Decimal places of latitude and longitude in cache keys
    #[serde(default = "EnvironmentConfig::default_coordinate_decimals")]
    pub coordinate_decimals: u32,
    #[serde(default = "EnvironmentConfig::default_failure_wave_height_m")]
    pub failure_wave_height_m: f64,
    #[serde(default = "EnvironmentConfig::default_missing_wave_height_m")]
    pub missing_wave_height_m: f64,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        EnvironmentConfig {
            base_url: Self::default_base_url(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            request_pacing_ms: Self::default_request_pacing_ms(),
            coordinate_decimals: Self::default_coordinate_decimals(),
            failure_wave_height_m: Self::default_failure_wave_height_m(),
            missing_wave_height_m: Self::default_missing_wave_height_m(),
        }
    }
}

impl EnvironmentConfig {
    fn default_base_url() -> String {
        DEFAULT_MARINE_API_URL.to_string()
    }

    fn default_request_timeout_ms() -> u64 {
        DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
    }

    fn default_request_pacing_ms() -> u64 {
        DEFAULT_REQUEST_PACING.as_millis() as u64
    }

    const fn default_coordinate_decimals() -> u32 {
        DEFAULT_COORDINATE_DECIMALS
    }

    const fn default_failure_wave_height_m() -> f64 {
        FAILURE_WAVE_HEIGHT_M
    }

    const fn default_missing_wave_height_m() -> f64 {
        MISSING_WAVE_HEIGHT_M
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn request_pacing(&self) -> Duration {
        Duration::from_millis(self.request_pacing_ms)
    }

    pub fn policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            failure_wave_height_m: self.failure_wave_height_m,
            missing_wave_height_m: self.missing_wave_height_m,
        }
    }

    /// HTTP client for the configured marine weather service
    pub fn client(&self) -> Result<OpenMeteoMarineClient, EnvironmentFetchError> {
        OpenMeteoMarineClient::new(&self.base_url, self.request_timeout())
    }

    /// Environment provider around source with these settings
    pub fn provider<S: MarineDataSource>(&self, source: S) -> EnvironmentProvider<S> {
        EnvironmentProvider::new(source)
            .with_policy(self.policy())
            .with_request_pacing(self.request_pacing())
            .with_coordinate_decimals(self.coordinate_decimals)
    }
}
