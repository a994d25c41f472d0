//! Everything environment related for the voyage wave simulator.
//! Gets significant wave height at a position and time from a marine weather service.
//! Every (position, date, hour) is fetched at most once, failures fall back to a fixed wave height so a voyage is never interrupted.
//! Author: G0rocks
//! Date: 2025-06-12

use crate::*;   // To use everything from the crate
use std::collections::HashMap;
use std::time::Duration;
use log::{debug, warn};
use serde::Deserialize;

// Constants
//----------------------------------------------------
/// Hourly marine weather endpoint
pub const DEFAULT_MARINE_API_URL: &str = "https://marine-api.open-meteo.com/v1/marine";
/// Wave height in [m] used when the marine weather service can not be reached or answers with garbage
pub const FAILURE_WAVE_HEIGHT_M: f64 = 2.5;
/// Wave height in [m] used when the service has no observation for the requested hour
pub const MISSING_WAVE_HEIGHT_M: f64 = 0.5;
/// Timeout for a single marine weather request
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
/// Pause after each network fetch to go easy on the marine weather service
pub const DEFAULT_REQUEST_PACING: Duration = Duration::from_millis(200);
/// Decimal places latitude and longitude are rounded to in cache keys
pub const DEFAULT_COORDINATE_DECIMALS: u32 = 2;
/// More decimals than this do not fit the scaled integer key for every longitude
pub const MAX_COORDINATE_DECIMALS: u32 = 9;


// Structs and Enums
//----------------------------------------------------
/// Cache key for one wave height observation
/// Latitude and longitude are rounded to a fixed number of decimals and stored as scaled integers so keys can be hashed
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct EnvironmentCacheKey {
    latitude_scaled: i64,
    longitude_scaled: i64,
    decimals: u32,
    date: time::Date,
    hour: u8,
}

impl EnvironmentCacheKey {
    /// Creates a key for the position rounded to decimals places and the UTC date and hour of timestamp
    pub fn new(latitude: f64, longitude: f64, timestamp: time::UtcDateTime, decimals: u32) -> EnvironmentCacheKey {
        let decimals = decimals.min(MAX_COORDINATE_DECIMALS);
        let scale = 10f64.powi(decimals as i32);
        EnvironmentCacheKey {
            latitude_scaled: (latitude * scale).round() as i64,
            longitude_scaled: (longitude * scale).round() as i64,
            decimals,
            date: timestamp.date(),
            hour: timestamp.hour(),
        }
    }

    /// Rounded latitude in decimal degrees
    pub fn latitude(&self) -> f64 {
        self.latitude_scaled as f64 / 10f64.powi(self.decimals as i32)
    }

    /// Rounded longitude in decimal degrees
    pub fn longitude(&self) -> f64 {
        self.longitude_scaled as f64 / 10f64.powi(self.decimals as i32)
    }

    pub fn date(&self) -> time::Date {
        self.date
    }

    /// Hour of day, 0 to 23
    pub fn hour(&self) -> u8 {
        self.hour
    }
}


/// In memory store of wave heights already asked for
/// Some(wave height) is an observation, None means the service had no observation for that hour
/// Entries are never replaced or removed
#[derive(Debug, Default, Clone)]
pub struct EnvironmentCache {
    entries: HashMap<EnvironmentCacheKey, Option<f64>>,
}

impl EnvironmentCache {
    pub fn new() -> EnvironmentCache {
        EnvironmentCache { entries: HashMap::new() }
    }

    /// Returns None if the key has not been fetched yet
    pub fn get(&self, key: &EnvironmentCacheKey) -> Option<Option<f64>> {
        self.entries.get(key).copied()
    }

    /// Stores the value for key unless the key is already present. Returns the value that ends up in the cache.
    pub fn insert(&mut self, key: EnvironmentCacheKey, wave_height: Option<f64>) -> Option<f64> {
        *self.entries.entry(key).or_insert(wave_height)
    }

    pub fn contains(&self, key: &EnvironmentCacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}


/// What a wave height query came back with, before any fallback is applied
#[derive(Debug)]
pub enum WaveHeightOutcome {
    /// Wave height in [m]
    Observed(f64),
    /// The service answered but has no observation for the requested hour
    MissingObservation,
    /// The query failed, nothing was cached
    FetchFailure(EnvironmentFetchError),
}


/// Wave heights in [m] to use when no observation is available
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FallbackPolicy {
    /// Used when the query fails
    pub failure_wave_height_m: f64,
    /// Used when the service has no observation for the hour
    pub missing_wave_height_m: f64,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        FallbackPolicy {
            failure_wave_height_m: FAILURE_WAVE_HEIGHT_M,
            missing_wave_height_m: MISSING_WAVE_HEIGHT_M,
        }
    }
}


/// Counters of how wave height queries were answered
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct EnvironmentStats {
    pub cache_hits: usize,
    /// Queries sent to the data source
    pub fetches: usize,
    pub missing_observations: usize,
    pub failures: usize,
}


/// Source of hourly significant wave heights
pub trait MarineDataSource {
    /// Returns the wave heights in [m] for one UTC calendar day at a position, indexed by hour of day
    /// A None entry means there is no observation for that hour
    fn hourly_wave_heights(&mut self, latitude: f64, longitude: f64, date: time::Date) -> Result<Vec<Option<f64>>, EnvironmentFetchError>;
}


/// Marine weather client that asks the open-meteo marine API over HTTP
#[derive(Debug, Clone)]
pub struct OpenMeteoMarineClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl OpenMeteoMarineClient {
    /// Creates a client for base_url where every request gives up after timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<OpenMeteoMarineClient, EnvironmentFetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;

        return Ok(OpenMeteoMarineClient {
            client,
            base_url: base_url.to_string(),
        });
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl MarineDataSource for OpenMeteoMarineClient {
    fn hourly_wave_heights(&mut self, latitude: f64, longitude: f64, date: time::Date) -> Result<Vec<Option<f64>>, EnvironmentFetchError> {
        let date_string = date.to_string();
        debug!("Requesting wave heights for ({}, {}) on {}", latitude, longitude, date_string);

        let body = self.client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("start_date", date_string.clone()),
                ("end_date", date_string),
                ("hourly", "wave_height".to_string()),
                ("timezone", "UTC".to_string()),
            ])
            .send()?
            .error_for_status()?
            .text()?;

        return parse_marine_response(&body);
    }
}


/// Answers wave height queries from the cache or the data source, applying the fallback policy when the source comes up empty
pub struct EnvironmentProvider<S: MarineDataSource> {
    source: S,
    cache: EnvironmentCache,
    policy: FallbackPolicy,
    request_pacing: Duration,
    coordinate_decimals: u32,
    stats: EnvironmentStats,
}

impl<S: MarineDataSource> EnvironmentProvider<S> {
    /// Creates a provider with an empty cache, the default fallback policy and the default request pacing
    pub fn new(source: S) -> EnvironmentProvider<S> {
        EnvironmentProvider {
            source,
            cache: EnvironmentCache::new(),
            policy: FallbackPolicy::default(),
            request_pacing: DEFAULT_REQUEST_PACING,
            coordinate_decimals: DEFAULT_COORDINATE_DECIMALS,
            stats: EnvironmentStats::default(),
        }
    }

    /// Uses a cache filled by an earlier provider
    pub fn with_cache(mut self, cache: EnvironmentCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Pause after every successful network fetch, Duration::ZERO turns pacing off
    pub fn with_request_pacing(mut self, request_pacing: Duration) -> Self {
        self.request_pacing = request_pacing;
        self
    }

    pub fn with_coordinate_decimals(mut self, decimals: u32) -> Self {
        self.coordinate_decimals = decimals.min(MAX_COORDINATE_DECIMALS);
        self
    }

    /// Queries the wave height at a position and time without applying any fallback
    /// Cache hits return right away. On a miss the data source is asked once, observations and missing observations are cached but failures are not.
    pub fn query_wave_height(&mut self, latitude: f64, longitude: f64, timestamp: time::UtcDateTime) -> WaveHeightOutcome {
        let key = EnvironmentCacheKey::new(latitude, longitude, timestamp, self.coordinate_decimals);

        // Cache hit, no network access and no pacing
        if let Some(cached) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return match cached {
                Some(wave_height) => WaveHeightOutcome::Observed(wave_height),
                None => WaveHeightOutcome::MissingObservation,
            };
        }

        // Cache miss, ask the data source for the whole day and pick out the hour
        self.stats.fetches += 1;
        debug!("Wave height cache miss for ({}, {}) {} {:02}h", key.latitude(), key.longitude(), key.date(), key.hour());
        let fetched = self.source
            .hourly_wave_heights(key.latitude(), key.longitude(), key.date())
            .and_then(|hourly| wave_height_for_hour(&hourly, key.hour()));

        let outcome = match fetched {
            Ok(Some(wave_height)) => {
                self.cache.insert(key, Some(wave_height));
                WaveHeightOutcome::Observed(wave_height)
            }
            Ok(None) => {
                self.stats.missing_observations += 1;
                self.cache.insert(key, None);
                WaveHeightOutcome::MissingObservation
            }
            Err(e) => {
                self.stats.failures += 1;
                return WaveHeightOutcome::FetchFailure(e);
            }
        };

        // Pace requests to the service
        if !self.request_pacing.is_zero() {
            std::thread::sleep(self.request_pacing);
        }

        return outcome;
    }

    /// Wave height in [m] at a position and time, never fails
    /// Missing observations give policy.missing_wave_height_m, failed queries give policy.failure_wave_height_m and a warning in the log
    pub fn fetch_wave_height(&mut self, latitude: f64, longitude: f64, timestamp: time::UtcDateTime) -> f64 {
        match self.query_wave_height(latitude, longitude, timestamp) {
            WaveHeightOutcome::Observed(wave_height) => wave_height,
            WaveHeightOutcome::MissingObservation => {
                debug!("No wave observation at ({:.4}, {:.4}) {} {:02}h, using {} m", latitude, longitude, timestamp.date(), timestamp.hour(), self.policy.missing_wave_height_m);
                self.policy.missing_wave_height_m
            }
            WaveHeightOutcome::FetchFailure(e) => {
                warn!("Wave height fetch failed at ({:.4}, {:.4}) {} {:02}h: {}. Using fallback of {} m", latitude, longitude, timestamp.date(), timestamp.hour(), e, self.policy.failure_wave_height_m);
                self.policy.failure_wave_height_m
            }
        }
    }

    pub fn cache(&self) -> &EnvironmentCache {
        &self.cache
    }

    /// Hands the cache back so a later run can reuse it
    pub fn into_cache(self) -> EnvironmentCache {
        self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    pub fn stats(&self) -> EnvironmentStats {
        self.stats
    }
}


/// Body of a marine weather response, only the part we use
#[derive(Debug, Deserialize)]
struct MarineResponse {
    hourly: HourlyWaveHeights,
}

#[derive(Debug, Deserialize)]
struct HourlyWaveHeights {
    wave_height: Vec<Option<f64>>,
}


// Functions
//----------------------------------------------------
/// Parses a marine weather JSON response into hourly wave heights
/// Expects {"hourly": {"wave_height": [..]}} where null entries are hours without an observation
pub fn parse_marine_response(body: &str) -> Result<Vec<Option<f64>>, EnvironmentFetchError> {
    let response: MarineResponse = serde_json::from_str(body)?;
    return Ok(response.hourly.wave_height);
}

/// Picks the wave height for hour out of a day of hourly values
/// A response too short to hold the hour, or a negative or non-finite wave height, is malformed
pub fn wave_height_for_hour(hourly: &[Option<f64>], hour: u8) -> Result<Option<f64>, EnvironmentFetchError> {
    let value = match hourly.get(hour as usize) {
        Some(value) => *value,
        None => return Err(EnvironmentFetchError::HourOutOfRange { hour, len: hourly.len() }),
    };

    match value {
        Some(wave_height) if !wave_height.is_finite() || wave_height < 0.0 => Err(EnvironmentFetchError::InvalidValue(wave_height)),
        _ => Ok(value),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    /// Data source that counts calls and answers with the same day every time
    struct StubSource {
        calls: usize,
        hourly: Option<Vec<Option<f64>>>,
    }

    impl StubSource {
        fn day(hourly: Vec<Option<f64>>) -> StubSource {
            StubSource { calls: 0, hourly: Some(hourly) }
        }

        fn failing() -> StubSource {
            StubSource { calls: 0, hourly: None }
        }
    }

    impl MarineDataSource for StubSource {
        fn hourly_wave_heights(&mut self, _latitude: f64, _longitude: f64, _date: time::Date) -> Result<Vec<Option<f64>>, EnvironmentFetchError> {
            self.calls += 1;
            match &self.hourly {
                Some(hourly) => Ok(hourly.clone()),
                None => Err(EnvironmentFetchError::Unavailable("stub is offline".to_string())),
            }
        }
    }

    fn hours() -> Vec<Option<f64>> {
        (0..24).map(|h| Some(0.1 * h as f64)).collect()
    }

    fn at(hour: u8, minute: u8) -> time::UtcDateTime {
        let date = time::Date::from_calendar_date(2024, time::Month::March, 14).unwrap();
        time::UtcDateTime::new(date, time::Time::from_hms(hour, minute, 0).unwrap())
    }

    fn provider(source: StubSource) -> EnvironmentProvider<StubSource> {
        EnvironmentProvider::new(source).with_request_pacing(Duration::ZERO)
    }

    #[test]
    fn same_key_fetches_once() {
        let mut env = provider(StubSource::day(hours()));
        let first = env.fetch_wave_height(10.0, 70.0, at(5, 0));
        let second = env.fetch_wave_height(10.0, 70.0, at(5, 45));
        assert_eq!(first, second);
        assert!((first - 0.5).abs() < 1e-12);
        assert_eq!(env.source().calls, 1);
        assert_eq!(env.stats(), EnvironmentStats { cache_hits: 1, fetches: 1, missing_observations: 0, failures: 0 });
    }

    #[test]
    fn rounding_merges_nearby_positions() {
        let mut env = provider(StubSource::day(hours()));
        env.fetch_wave_height(10.001, 70.002, at(3, 0));
        env.fetch_wave_height(9.998, 69.997, at(3, 0));
        assert_eq!(env.source().calls, 1);
        assert_eq!(env.cache().len(), 1);
    }

    #[test]
    fn different_hour_is_a_new_key() {
        let mut env = provider(StubSource::day(hours()));
        let h2 = env.fetch_wave_height(10.0, 70.0, at(2, 0));
        let h3 = env.fetch_wave_height(10.0, 70.0, at(3, 0));
        assert_eq!(env.source().calls, 2);
        assert!(h3 > h2);
    }

    #[test]
    fn missing_observation_is_cached_with_neutral_default() {
        let mut hourly = hours();
        hourly[7] = None;
        let mut env = provider(StubSource::day(hourly));
        assert!(matches!(env.query_wave_height(1.0, 1.0, at(7, 0)), WaveHeightOutcome::MissingObservation));
        assert_eq!(env.fetch_wave_height(1.0, 1.0, at(7, 30)), MISSING_WAVE_HEIGHT_M);
        assert_eq!(env.source().calls, 1);
        assert_eq!(env.stats().missing_observations, 1);
    }

    #[test]
    fn failure_falls_back_and_is_not_cached() {
        let mut env = provider(StubSource::failing());
        assert_eq!(env.fetch_wave_height(1.0, 1.0, at(7, 0)), FAILURE_WAVE_HEIGHT_M);
        assert_eq!(env.fetch_wave_height(1.0, 1.0, at(7, 0)), FAILURE_WAVE_HEIGHT_M);
        // Failures are retried on the next query for the key, never within one
        assert_eq!(env.source().calls, 2);
        assert!(env.cache().is_empty());
        assert_eq!(env.stats().failures, 2);
    }

    #[test]
    fn short_response_is_a_failure() {
        let mut env = provider(StubSource::day(vec![Some(1.0); 6]));
        assert!(matches!(
            env.query_wave_height(1.0, 1.0, at(12, 0)),
            WaveHeightOutcome::FetchFailure(EnvironmentFetchError::HourOutOfRange { hour: 12, len: 6 })
        ));
        assert!(env.cache().is_empty());
    }

    #[test]
    fn pacing_only_after_successful_fetch() {
        let pacing = Duration::from_millis(50);

        // Miss goes to the source and pauses
        let mut env = EnvironmentProvider::new(StubSource::day(hours())).with_request_pacing(pacing);
        let timer = std::time::Instant::now();
        env.fetch_wave_height(10.0, 70.0, at(5, 0));
        assert!(timer.elapsed() >= pacing);

        // Hit on the same key does not
        let timer = std::time::Instant::now();
        env.fetch_wave_height(10.0, 70.0, at(5, 30));
        assert!(timer.elapsed() < pacing / 2);
        assert_eq!(env.stats().cache_hits, 1);

        // Missing observations are a successful fetch too
        let mut hourly = hours();
        hourly[8] = None;
        let mut env = EnvironmentProvider::new(StubSource::day(hourly)).with_request_pacing(pacing);
        let timer = std::time::Instant::now();
        env.fetch_wave_height(10.0, 70.0, at(8, 0));
        assert!(timer.elapsed() >= pacing);

        // Failures do not pause
        let mut env = EnvironmentProvider::new(StubSource::failing()).with_request_pacing(pacing);
        let timer = std::time::Instant::now();
        assert_eq!(env.fetch_wave_height(10.0, 70.0, at(5, 0)), FAILURE_WAVE_HEIGHT_M);
        assert!(timer.elapsed() < pacing / 2);
    }

    #[test]
    fn custom_policy_is_used() {
        let policy = FallbackPolicy { failure_wave_height_m: 4.0, missing_wave_height_m: 0.0 };
        let mut env = provider(StubSource::failing()).with_policy(policy);
        assert_eq!(env.fetch_wave_height(0.0, 0.0, at(0, 0)), 4.0);
    }

    #[test]
    fn cache_can_be_handed_to_next_provider() {
        let mut env = provider(StubSource::day(hours()));
        env.fetch_wave_height(10.0, 70.0, at(5, 0));
        let cache = env.into_cache();

        let mut next = provider(StubSource::failing()).with_cache(cache);
        assert!((next.fetch_wave_height(10.0, 70.0, at(5, 0)) - 0.5).abs() < 1e-12);
        assert_eq!(next.source().calls, 0);
    }

    #[test]
    fn cache_insert_never_overwrites() {
        let mut cache = EnvironmentCache::new();
        let key = EnvironmentCacheKey::new(1.0, 2.0, at(1, 0), 2);
        assert_eq!(cache.insert(key, Some(1.5)), Some(1.5));
        assert_eq!(cache.insert(key, Some(9.0)), Some(1.5));
        assert_eq!(cache.get(&key), Some(Some(1.5)));
        assert!(cache.contains(&key));
    }

    #[test]
    fn cache_key_rounds_coordinates() {
        let key = EnvironmentCacheKey::new(18.999990, 72.400009, at(23, 59), 2);
        assert!((key.latitude() - 19.0).abs() < 1e-12);
        assert!((key.longitude() - 72.4).abs() < 1e-12);
        assert_eq!(key.hour(), 23);
        assert_eq!(key.date().to_string(), "2024-03-14");
    }

    #[test]
    fn parse_response_with_nulls() {
        let body = r#"{"latitude":0.0,"longitude":0.0,"hourly_units":{"wave_height":"m"},"hourly":{"time":["2024-03-14T00:00","2024-03-14T01:00","2024-03-14T02:00"],"wave_height":[0.84,null,1.02]}}"#;
        let hourly = parse_marine_response(body).unwrap();
        assert_eq!(hourly, vec![Some(0.84), None, Some(1.02)]);
    }

    #[test]
    fn parse_response_without_hourly_is_malformed() {
        let body = r#"{"error":true,"reason":"No data is available for this location"}"#;
        assert!(matches!(parse_marine_response(body), Err(EnvironmentFetchError::Malformed(_))));
    }

    #[test]
    fn negative_wave_height_is_rejected() {
        assert!(matches!(wave_height_for_hour(&[Some(-1.0)], 0), Err(EnvironmentFetchError::InvalidValue(_))));
        assert_eq!(wave_height_for_hour(&[None, Some(2.0)], 1).unwrap(), Some(2.0));
        assert_eq!(wave_height_for_hour(&[None, Some(2.0)], 0).unwrap(), None);
    }
}
