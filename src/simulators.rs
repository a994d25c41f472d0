//! Everything Simulator related for the voyage wave simulator.
//! Steps a single vessel along a route at constant nominal speed and samples the sea conditions at every time step.
//! Author: G0rocks
//! Date: 2025-06-12

use crate::*;   // To use everything from the crate
use log::info;
use rand::Rng;

// Constants
//----------------------------------------------------
/// Instantaneous speed varies by up to this fraction of the nominal speed either way
pub const DEFAULT_SPEED_JITTER_FRACTION: f64 = 0.025;
/// Maximum number of time steps in one voyage
pub const DEFAULT_MAX_STEPS: usize = 1_000_000;


// Structs and Enums
//----------------------------------------------------
/// One sample of the voyage
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VoyageRecord {
    /// UTC time of the sample
    pub timestamp: time::UtcDateTime,
    /// Hours since the voyage started
    pub elapsed_hours: f64,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Ambient temperature in [K]
    pub temperature_k: f64,
    /// Sea state from 0 to 9
    pub sea_state: u8,
    /// Significant wave height in [m]
    pub wave_height_m: f64,
    /// Instantaneous ship speed in [kn]
    pub speed_knots: f64,
}


/// Inputs of a voyage
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VoyageParameters {
    /// Nominal speed in [kn], must be positive
    pub speed_knots: f64,
    /// Time step in [h], must be positive
    pub time_step_hours: f64,
    /// UTC start of the voyage
    pub start_time: time::UtcDateTime,
    /// Fraction of the nominal speed the instantaneous speed may vary by, in [0, 1)
    pub speed_jitter_fraction: f64,
    /// Refuse voyages needing more time steps than this
    pub max_steps: usize,
}

impl VoyageParameters {
    /// Creates voyage parameters with the default speed jitter and step limit
    pub fn new(speed_knots: f64, time_step_hours: f64, start_time: time::UtcDateTime) -> VoyageParameters {
        VoyageParameters {
            speed_knots,
            time_step_hours,
            start_time,
            speed_jitter_fraction: DEFAULT_SPEED_JITTER_FRACTION,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_speed_jitter(mut self, speed_jitter_fraction: f64) -> Self {
        self.speed_jitter_fraction = speed_jitter_fraction;
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Checks that speed and time step are positive finite numbers and the jitter is in [0, 1)
    pub fn validate(&self) -> Result<(), VoyageError> {
        if !self.speed_knots.is_finite() || self.speed_knots <= 0.0 {
            return Err(VoyageError::InvalidParameter { field: "speed_knots", value: self.speed_knots });
        }
        if !self.time_step_hours.is_finite() || self.time_step_hours <= 0.0 {
            return Err(VoyageError::InvalidParameter { field: "time_step_hours", value: self.time_step_hours });
        }
        if !(0.0..1.0).contains(&self.speed_jitter_fraction) {
            return Err(VoyageError::InvalidParameter { field: "speed_jitter_fraction", value: self.speed_jitter_fraction });
        }
        Ok(())
    }

    /// Nominal speed with units
    pub fn speed(&self) -> uom::si::f64::Velocity {
        uom::si::f64::Velocity::new::<uom::si::velocity::knot>(self.speed_knots)
    }

    /// Nominal speed in [km/h], 1 kn = 1.852 km/h
    pub fn speed_kmh(&self) -> f64 {
        self.speed().get::<uom::si::velocity::kilometer_per_hour>()
    }
}


/// Where a voyage simulation stands
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VoyageState {
    NotStarted,
    /// step is the index of the next record to produce
    Stepping { step: usize },
    Completed,
}


/// Gets told about every record as soon as it is produced
/// Implemented for closures taking (step, step_count, record)
pub trait VoyageObserver {
    fn on_step(&mut self, step: usize, step_count: usize, record: &VoyageRecord);
}

impl<F> VoyageObserver for F
where
    F: FnMut(usize, usize, &VoyageRecord),
{
    fn on_step(&mut self, step: usize, step_count: usize, record: &VoyageRecord) {
        self(step, step_count, record)
    }
}


/// Simulates one vessel transiting a route at constant nominal speed
/// Produces a record for every step i = 0..=step_count where step_count = floor(transit time / time step).
/// A simulator is single pass, once Completed it produces no more records.
pub struct VoyageSimulator<'r, S: MarineDataSource, R: Rng> {
    route: &'r Route,
    parameters: VoyageParameters,
    environment: EnvironmentProvider<S>,
    rng: R,
    speed_kmh: f64,
    step_count: usize,
    state: VoyageState,
}

impl<'r, S: MarineDataSource, R: Rng> VoyageSimulator<'r, S, R> {
    /// Sets up a voyage along route
    /// rng drives the speed jitter, seed it to get reproducible voyages
    pub fn new(route: &'r Route, parameters: VoyageParameters, environment: EnvironmentProvider<S>, rng: R) -> Result<VoyageSimulator<'r, S, R>, VoyageError> {
        parameters.validate()?;

        let speed_kmh = parameters.speed_kmh();
        let transit_hours = route.total_length_km() / speed_kmh;
        let steps = (transit_hours / parameters.time_step_hours).floor();
        if steps > parameters.max_steps as f64 {
            return Err(VoyageError::TooManySteps { steps, max: parameters.max_steps });
        }

        return Ok(VoyageSimulator {
            route,
            parameters,
            environment,
            rng,
            speed_kmh,
            step_count: steps as usize,
            state: VoyageState::NotStarted,
        });
    }

    /// Number of whole time steps the transit takes. The voyage produces step_count + 1 records.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Nominal speed in [km/h]
    pub fn speed_kmh(&self) -> f64 {
        self.speed_kmh
    }

    /// Time in [h] to cover the whole route at nominal speed
    pub fn total_transit_hours(&self) -> f64 {
        self.route.total_length_km() / self.speed_kmh
    }

    pub fn state(&self) -> VoyageState {
        self.state
    }

    pub fn route(&self) -> &Route {
        self.route
    }

    pub fn parameters(&self) -> &VoyageParameters {
        &self.parameters
    }

    pub fn environment(&self) -> &EnvironmentProvider<S> {
        &self.environment
    }

    /// Gives back the environment provider, with its cache, once the simulator is done
    pub fn into_environment(self) -> EnvironmentProvider<S> {
        self.environment
    }

    /// Produces the next record, or None once the voyage is completed
    pub fn next_record(&mut self) -> Result<Option<VoyageRecord>, VoyageError> {
        let step = match self.state {
            VoyageState::NotStarted => 0,
            VoyageState::Stepping { step } => step,
            VoyageState::Completed => return Ok(None),
        };

        let record = self.record_at(step)?;

        // Advance, past the last step the voyage is done
        self.state = if step + 1 > self.step_count {
            VoyageState::Completed
        } else {
            VoyageState::Stepping { step: step + 1 }
        };

        return Ok(Some(record));
    }

    /// Runs the voyage to completion and returns the remaining records in step order
    pub fn run(&mut self) -> Result<Vec<VoyageRecord>, VoyageError> {
        self.run_with_observer(&mut |_: usize, _: usize, _: &VoyageRecord| {})
    }

    /// Runs the voyage to completion, telling observer about every record
    pub fn run_with_observer(&mut self, observer: &mut dyn VoyageObserver) -> Result<Vec<VoyageRecord>, VoyageError> {
        info!(
            "Voyage of {:.2} km at {} kn: {:.2} h transit, {} steps of {} h",
            self.route.total_length_km(),
            self.parameters.speed_knots,
            self.total_transit_hours(),
            self.step_count,
            self.parameters.time_step_hours
        );

        let mut records: Vec<VoyageRecord> = Vec::with_capacity(self.step_count + 1);
        loop {
            let step = match self.state {
                VoyageState::NotStarted => 0,
                VoyageState::Stepping { step } => step,
                VoyageState::Completed => break,
            };
            match self.next_record()? {
                Some(record) => {
                    observer.on_step(step, self.step_count, &record);
                    records.push(record);
                }
                None => break,
            }
        }

        let stats = self.environment.stats();
        info!(
            "Voyage completed with {} records. Wave heights: {} fetched, {} from cache, {} missing, {} failed",
            records.len(),
            stats.fetches,
            stats.cache_hits,
            stats.missing_observations,
            stats.failures
        );
        return Ok(records);
    }

    /// Computes the record for step i
    /// Position and time depend only on i and the nominal speed, never on the jittered speed of earlier steps
    fn record_at(&mut self, step: usize) -> Result<VoyageRecord, VoyageError> {
        let elapsed_hours = step as f64 * self.parameters.time_step_hours;
        let distance_km = elapsed_hours * self.speed_kmh;

        let position = PositionResolver::new(self.route).position_at(distance_km);
        let (latitude, longitude) = (position.y(), position.x());

        let timestamp = step_timestamp(self.parameters.start_time, elapsed_hours)?;
        let wave_height_m = self.environment.fetch_wave_height(latitude, longitude, timestamp);

        let speed_knots = jittered_speed(&mut self.rng, self.parameters.speed_knots, self.parameters.speed_jitter_fraction);

        return Ok(VoyageRecord {
            timestamp,
            elapsed_hours,
            latitude,
            longitude,
            temperature_k: ambient_temperature_k(latitude),
            sea_state: wave_height_to_sea_state(wave_height_m),
            wave_height_m,
            speed_knots,
        });
    }
}


/// Statistics over a finished voyage
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VoyageSummary {
    pub records: usize,
    /// Elapsed time of the last record in [h]
    pub elapsed_hours: f64,
    pub speed_mean: uom::si::f64::Velocity,
    /// Sample standard deviation of the instantaneous speed
    pub speed_std: uom::si::f64::Velocity,
    pub wave_height_mean_m: f64,
    pub wave_height_max_m: f64,
    pub max_sea_state: u8,
    pub temperature_mean_k: f64,
}

impl VoyageSummary {
    /// Evaluates a record sequence, fails on an empty one
    pub fn from_records(records: &[VoyageRecord]) -> Result<VoyageSummary, VoyageError> {
        let last = records.last().ok_or(VoyageError::EmptyRecords)?;
        let n = records.len() as f64;

        let speeds: Vec<uom::si::f64::Velocity> = records
            .iter()
            .map(|r| uom::si::f64::Velocity::new::<uom::si::velocity::knot>(r.speed_knots))
            .collect();
        let (speed_mean, speed_std) = get_speed_mean_and_std(&speeds)?;

        return Ok(VoyageSummary {
            records: records.len(),
            elapsed_hours: last.elapsed_hours,
            speed_mean,
            speed_std,
            wave_height_mean_m: records.iter().map(|r| r.wave_height_m).sum::<f64>() / n,
            wave_height_max_m: records.iter().map(|r| r.wave_height_m).fold(0.0, f64::max),
            max_sea_state: records.iter().map(|r| r.sea_state).max().unwrap_or(0),
            temperature_mean_k: records.iter().map(|r| r.temperature_k).sum::<f64>() / n,
        });
    }
}


// Functions
//----------------------------------------------------
/// Absolute time of a step, elapsed_hours after start rounded to the nearest second
pub fn step_timestamp(start: time::UtcDateTime, elapsed_hours: f64) -> Result<time::UtcDateTime, VoyageError> {
    let seconds = (elapsed_hours * 3600.0).round();
    if !seconds.is_finite() || seconds.abs() > i64::MAX as f64 {
        return Err(VoyageError::TimestampOutOfRange { hours: elapsed_hours });
    }
    start
        .checked_add(time::Duration::seconds(seconds as i64))
        .ok_or(VoyageError::TimestampOutOfRange { hours: elapsed_hours })
}

/// Nominal speed perturbed by a uniform random fraction in [-jitter_fraction, jitter_fraction]
pub fn jittered_speed<R: Rng>(rng: &mut R, nominal_knots: f64, jitter_fraction: f64) -> f64 {
    if jitter_fraction <= 0.0 {
        return nominal_knots;
    }
    nominal_knots * (1.0 + rng.random_range(-jitter_fraction..=jitter_fraction))
}

/// Returns the average and sample standard deviation of a slice of uom::si::f64::Velocity objects
/// A single value has a standard deviation of zero
/// # Example:
/// `let (my_mean, my_std) = get_speed_mean_and_std(&my_vec)?;`
pub fn get_speed_mean_and_std(speed_vec: &[uom::si::f64::Velocity]) -> Result<(uom::si::f64::Velocity, uom::si::f64::Velocity), VoyageError> {
    // Validate that the speed_vec has at least 1 value
    if speed_vec.is_empty() {
        return Err(VoyageError::EmptyRecords);
    }

    // Find mean
    let tot_speed: f64 = speed_vec.iter().map(|s| s.get::<uom::si::velocity::meter_per_second>()).sum();
    let speed_mean_f64 = tot_speed / speed_vec.len() as f64;

    // Sum squared deviations and divide by number of values - 1 to get the variance
    let mut variance: f64 = 0.0;
    if speed_vec.len() > 1 {
        for speed in speed_vec {
            variance += (speed.get::<uom::si::velocity::meter_per_second>() - speed_mean_f64).powi(2);
        }
        variance /= (speed_vec.len() - 1) as f64;
    }

    let speed_mean = uom::si::f64::Velocity::new::<uom::si::velocity::meter_per_second>(speed_mean_f64);
    let speed_std = uom::si::f64::Velocity::new::<uom::si::velocity::meter_per_second>(variance.sqrt());
    return Ok((speed_mean, speed_std));
}
