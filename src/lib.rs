//! Voyage wave simulator simulates a single vessel transiting a multi-waypoint route at constant nominal speed.
//! At every time step it records the position of the vessel together with the significant wave height, sea state, ambient temperature and instantaneous speed.
//! Author: G0rocks
//! Date: 2025-06-12
//! Wave heights come from a marine weather service, see the environment module. Every other quantity is computed locally.
//! ## Example
//! ```no_run
//! use voyage_wave_simulator::*;
//! use rand::SeedableRng;
//!
//! let route = Route::from_lat_lon(&[(19.0, 72.4), (12.9, 74.8)]).unwrap();
//! let start = string_to_utc_date_time("2024-01-01 00:00").unwrap();
//! let parameters = VoyageParameters::new(14.0, 1.0, start);
//! let client = OpenMeteoMarineClient::new(DEFAULT_MARINE_API_URL, DEFAULT_REQUEST_TIMEOUT).unwrap();
//! let environment = EnvironmentProvider::new(client);
//! let rng = rand::rngs::StdRng::seed_from_u64(1);
//! let mut simulator = VoyageSimulator::new(&route, parameters, environment, rng).unwrap();
//! let records = simulator.run().unwrap();
//! records_to_csv("voyage.csv", &records).unwrap();
//! ```

// Internal modules
pub mod errors;
pub use crate::errors::*;
pub mod routes;
pub use crate::routes::*;
pub mod environment;
pub use crate::environment::*;
pub mod metrics;
pub use crate::metrics::*;
pub mod simulators;
pub use crate::simulators::*; // Import the simulators module
pub mod config;
pub use crate::config::*;
pub mod export;
pub use crate::export::*;


// Helper functions
//----------------------------------------------------
/// Converts a string into a time::UtcDateTime
/// time_string: The string to convert in the format YYYY-MM-DD hh:mm or YYYY-MM-DD hh:mm:ss, a T between date and time is also accepted
/// # Example:
/// `let start: time::UtcDateTime = string_to_utc_date_time("2024-01-01 06:30")?;`
pub fn string_to_utc_date_time(time_string: &str) -> Result<time::UtcDateTime, VoyageError> {
    // Remove whitespace around the string
    let working_str: &str = time_string.trim();
    let invalid = || VoyageError::InvalidTimestamp(time_string.to_string());

    // Check the length and the separators before slicing
    if !working_str.is_ascii() || !(working_str.len() == 16 || working_str.len() == 19) {
        return Err(invalid());
    }
    let bytes = working_str.as_bytes();
    if bytes[4] != b'-' || bytes[7] != b'-' || !(bytes[10] == b' ' || bytes[10] == b'T') || bytes[13] != b':' {
        return Err(invalid());
    }
    if working_str.len() == 19 && bytes[16] != b':' {
        return Err(invalid());
    }

    // Get parts from string
    let year: i32 = working_str[0..4].parse::<i32>().map_err(|_| invalid())?;
    let month = time::Month::try_from(working_str[5..7].parse::<u8>().map_err(|_| invalid())?).map_err(|_| invalid())?;
    let day_of_month: u8 = working_str[8..10].parse::<u8>().map_err(|_| invalid())?;
    let date = time::Date::from_calendar_date(year, month, day_of_month).map_err(|_| invalid())?;

    let hour: u8 = working_str[11..13].parse::<u8>().map_err(|_| invalid())?;
    let minutes: u8 = working_str[14..16].parse::<u8>().map_err(|_| invalid())?;
    let seconds: u8 = if working_str.len() == 19 {
        working_str[17..19].parse::<u8>().map_err(|_| invalid())?
    } else {
        0
    };
    let time_hms = time::Time::from_hms(hour, minutes, seconds).map_err(|_| invalid())?;

    return Ok(time::UtcDateTime::new(date, time_hms));
}

/// Converts a string into a geo::Point object
/// coord_string: "latitude,longitude" in decimal degrees (e.g., "52.5200,13.4050")
/// # Example:
/// `let my_coord: geo::Point = string_to_point("52.5200,13.4050")?;`
/// Note that the output is a geo::Point::new(longitude, latitude) but the input string must be in the format of latitude,longitude so the order is reversed
pub fn string_to_point(coord_string: &str) -> Result<geo::Point, VoyageError> {
    let coord_str_vec: Vec<&str> = coord_string.trim().split(',').collect();

    // Should have latitude and longitude
    if coord_str_vec.len() != 2 {
        return Err(VoyageError::InvalidCoordinate(coord_string.to_string()));
    }

    let latitude: f64 = parse_degrees(coord_str_vec[0], coord_string)?;
    let longitude: f64 = parse_degrees(coord_str_vec[1], coord_string)?;

    return Ok(geo::Point::new(normalize_longitude(longitude), latitude));
}

/// Parses one coordinate in decimal degrees, original is the full string for the error message
pub(crate) fn parse_degrees(value: &str, original: &str) -> Result<f64, VoyageError> {
    match value.trim().parse::<f64>() {
        Ok(degrees) if degrees.is_finite() => Ok(degrees),
        _ => Err(VoyageError::InvalidCoordinate(original.to_string())),
    }
}

/// Wraps a longitude into [-180°, 180°]
pub fn normalize_longitude(longitude: f64) -> f64 {
    let mut longitude = longitude;
    while longitude < -180.0 {
        longitude += 360.0;
    }
    while longitude > 180.0 {
        longitude -= 360.0;
    }
    return longitude;
}


// Set up tests here
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_with_and_without_seconds() {
        let ts = string_to_utc_date_time("2024-02-29 23:15").unwrap();
        assert_eq!(ts.year(), 2024);
        assert_eq!(ts.month(), time::Month::February);
        assert_eq!(ts.day(), 29);
        assert_eq!(ts.hour(), 23);
        assert_eq!(ts.minute(), 15);
        assert_eq!(ts.second(), 0);

        let ts = string_to_utc_date_time(" 2024-03-01T01:02:03 ").unwrap();
        assert_eq!(ts.second(), 3);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(string_to_utc_date_time("2023-02-29 00:00").is_err());
        assert!(string_to_utc_date_time("2024-01-01").is_err());
        assert!(string_to_utc_date_time("2024/01/01 00:00").is_err());
        assert!(string_to_utc_date_time("2024-01-01 25:00").is_err());
        assert!(string_to_utc_date_time("2024-01-01 00:00:6ø").is_err());
    }

    #[test]
    fn parse_point_reverses_order() {
        let p = string_to_point("52.5200, 13.4050").unwrap();
        assert_eq!(p.y(), 52.52);
        assert_eq!(p.x(), 13.405);
    }

    #[test]
    fn parse_point_wraps_longitude() {
        let p = string_to_point("10.0,190.0").unwrap();
        assert_eq!(p.x(), -170.0);
        assert_eq!(normalize_longitude(-540.0), -180.0);
    }

    #[test]
    fn parse_point_rejects_garbage() {
        assert!(matches!(string_to_point("52.52"), Err(VoyageError::InvalidCoordinate(_))));
        assert!(matches!(string_to_point("north,east"), Err(VoyageError::InvalidCoordinate(_))));
        assert!(matches!(string_to_point("1,2,3"), Err(VoyageError::InvalidCoordinate(_))));
        assert!(matches!(string_to_point("NaN,2"), Err(VoyageError::InvalidCoordinate(_))));
    }
}
