//! Everything route related for the voyage wave simulator.
//! A route is an ordered list of waypoints joined by great circle segments. Positions along it are found from the distance traveled.
//! Author: G0rocks
//! Date: 2025-06-12

use crate::*;   // To use everything from the crate

// Constants
//----------------------------------------------------
/// Radius of the spherical earth used for the haversine distance in [km]
pub const EARTH_RADIUS_KM: f64 = 6371.0;


// Structs and Enums
//----------------------------------------------------
/// Fixed ordered list of waypoints with precomputed segment lengths
/// Waypoints are geo::Point::new(longitude, latitude)
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    waypoints: Vec<geo::Point>,
    /// Haversine length of each segment in [km], segment i goes from waypoint i to waypoint i+1
    segment_lengths: Vec<f64>,
    /// Sum of all segment lengths in [km]
    total_length: f64,
}

impl Route {
    /// Creates a route from waypoints given as geo::Point::new(longitude, latitude)
    /// Longitudes up to 360° are wrapped into [-180°, 180°]
    /// Fails with VoyageError::InvalidRoute if fewer than 2 waypoints are given
    pub fn new(waypoints: Vec<geo::Point>) -> Result<Route, VoyageError> {
        if waypoints.len() < 2 {
            return Err(VoyageError::InvalidRoute { waypoints: waypoints.len() });
        }

        // Every waypoint must be a real place on the globe
        for (index, point) in waypoints.iter().enumerate() {
            let (latitude, longitude) = (point.y(), point.x());
            if !latitude.is_finite() || !longitude.is_finite() || latitude.abs() > 90.0 || longitude < -180.0 || longitude > 360.0 {
                return Err(VoyageError::InvalidWaypoint { index, latitude, longitude });
            }
        }
        let waypoints: Vec<geo::Point> = waypoints
            .into_iter()
            .map(|p| geo::Point::new(normalize_longitude(p.x()), p.y()))
            .collect();

        let segment_lengths: Vec<f64> = waypoints
            .windows(2)
            .map(|pair| haversine_distance_km(pair[0], pair[1]))
            .collect();
        let total_length = segment_lengths.iter().sum();

        return Ok(Route {
            waypoints,
            segment_lengths,
            total_length,
        });
    }

    /// Creates a route from (latitude, longitude) pairs in decimal degrees
    /// # Example:
    /// `let route = Route::from_lat_lon(&[(0.0, 0.0), (0.0, 1.0)])?;`
    pub fn from_lat_lon(coordinates: &[(f64, f64)]) -> Result<Route, VoyageError> {
        let waypoints = coordinates
            .iter()
            .map(|(latitude, longitude)| geo::Point::new(*longitude, *latitude))
            .collect();
        return Route::new(waypoints);
    }

    pub fn waypoints(&self) -> &[geo::Point] {
        &self.waypoints
    }

    /// Segment lengths in [km] in route order
    pub fn segment_lengths(&self) -> &[f64] {
        &self.segment_lengths
    }

    pub fn num_segments(&self) -> usize {
        self.segment_lengths.len()
    }

    /// Total route length in [km]
    pub fn total_length_km(&self) -> f64 {
        self.total_length
    }

    /// Total route length with units
    pub fn total_length(&self) -> uom::si::f64::Length {
        uom::si::f64::Length::new::<uom::si::length::kilometer>(self.total_length)
    }

    /// Last waypoint of the route
    pub fn final_waypoint(&self) -> geo::Point {
        // A route always holds at least 2 waypoints
        self.waypoints[self.waypoints.len() - 1]
    }
}


/// Where along the route a cumulative distance falls
/// segment is in [0, num_segments - 1] and fraction in [0, 1]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SegmentCursor {
    pub segment: usize,
    pub fraction: f64,
}


/// Resolves distance traveled along a route into a position
/// Segments are scanned linearly from the start of the route every time, the routes are short enough for that
#[derive(Debug, Copy, Clone)]
pub struct PositionResolver<'a> {
    route: &'a Route,
}

impl<'a> PositionResolver<'a> {
    pub fn new(route: &'a Route) -> PositionResolver<'a> {
        PositionResolver { route }
    }

    /// Finds the active segment and the fraction within it for a cumulative distance in [km]
    /// Distances past the end of the route clamp to the last segment with fraction 1, negative distances count as 0
    pub fn locate(&self, distance_km: f64) -> SegmentCursor {
        let mut remainder = distance_km.max(0.0);

        for (segment, length) in self.route.segment_lengths.iter().enumerate() {
            if remainder <= *length {
                // Zero length segments can only be hit at their start
                let fraction = if *length > 0.0 { remainder / length } else { 0.0 };
                return SegmentCursor {
                    segment,
                    fraction: fraction.clamp(0.0, 1.0),
                };
            }
            remainder -= length;
        }

        // Went past the end of the route, stay at the final waypoint
        return SegmentCursor {
            segment: self.route.num_segments() - 1,
            fraction: 1.0,
        };
    }

    /// Position of the vessel after traveling distance_km along the route
    pub fn position_at(&self, distance_km: f64) -> geo::Point {
        let cursor = self.locate(distance_km);
        let p1 = self.route.waypoints[cursor.segment];
        let p2 = self.route.waypoints[cursor.segment + 1];
        return interpolate(p1, p2, cursor.fraction);
    }
}


// Functions
//----------------------------------------------------
/// Great circle distance in [km] between two points using the haversine formula on a sphere with radius EARTH_RADIUS_KM
pub fn haversine_distance_km(p1: geo::Point, p2: geo::Point) -> f64 {
    let lat1 = p1.y().to_radians();
    let lat2 = p2.y().to_radians();
    let delta_lat = lat2 - lat1;
    let delta_lon = (p2.x() - p1.x()).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push a a hair above 1 for antipodal points
    let a = a.clamp(0.0, 1.0);

    return 2.0 * EARTH_RADIUS_KM * a.sqrt().atan2((1.0 - a).sqrt());
}

/// Calculates the haversine distance between two points and returns the distance in uom::si::f64::Length
pub fn haversine_distance_uom_units(p1: geo::Point, p2: geo::Point) -> uom::si::f64::Length {
    uom::si::f64::Length::new::<uom::si::length::kilometer>(haversine_distance_km(p1, p2))
}

/// Linear blend of latitude and longitude between p1 and p2
/// Not a geodesic interpolation, good enough for hourly positions on routes away from the poles
/// Longitude goes the short way round, so a segment crossing the antimeridian stays near it like its haversine length says
/// fraction 0 returns p1 and fraction 1 returns p2 exactly
pub fn interpolate(p1: geo::Point, p2: geo::Point, fraction: f64) -> geo::Point {
    if fraction <= 0.0 {
        return p1;
    }
    if fraction >= 1.0 {
        return p2;
    }
    let mut delta_lon = p2.x() - p1.x();
    if delta_lon > 180.0 {
        delta_lon -= 360.0;
    } else if delta_lon < -180.0 {
        delta_lon += 360.0;
    }
    let longitude = normalize_longitude(p1.x() + delta_lon * fraction);
    let latitude = p1.y() + (p2.y() - p1.y()) * fraction;
    return geo::Point::new(longitude, latitude);
}
