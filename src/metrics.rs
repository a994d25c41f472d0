//! Derived metrics for the voyage wave simulator.
//! Converts significant wave height to a sea state and latitude to ambient temperature.
//! Author: G0rocks
//! Date: 2025-06-12

// Constants
//----------------------------------------------------
/// Upper bounds in [m] of the significant wave height for sea states 0 to 8. Anything at or above the last bound is sea state 9.
pub const SEA_STATE_UPPER_BOUNDS_M: [f64; 9] = [0.1, 0.3, 0.9, 1.9, 3.3, 5.0, 7.5, 11.5, 15.0];

/// Highest sea state on the scale
pub const MAX_SEA_STATE: u8 = 9;

/// Mean ambient temperature in [°C] used in the temperature model
const BASE_TEMPERATURE_C: f64 = 20.0;
/// Amplitude of the latitude dependence in [°C]
const TEMPERATURE_AMPLITUDE_C: f64 = 10.0;


// Functions
//----------------------------------------------------
/// Converts significant wave height in [m] to an integer sea state from 0 to 9
/// Each bound is tested with strictly less than in ascending order and the first match wins, so a height equal to a bound belongs to the higher sea state
/// # Example:
/// `assert_eq!(wave_height_to_sea_state(0.95), 3);`
pub fn wave_height_to_sea_state(wave_height: f64) -> u8 {
    match SEA_STATE_UPPER_BOUNDS_M.iter().position(|bound| wave_height < *bound) {
        Some(sea_state) => sea_state as u8,
        None => MAX_SEA_STATE,
    }
}

/// Ambient temperature at a latitude, 20 + 10·cos(latitude) in [°C]
/// Does not depend on time of day or season
pub fn ambient_temperature(latitude: f64) -> uom::si::f64::ThermodynamicTemperature {
    let celsius = BASE_TEMPERATURE_C + TEMPERATURE_AMPLITUDE_C * latitude.to_radians().cos();
    uom::si::f64::ThermodynamicTemperature::new::<uom::si::thermodynamic_temperature::degree_celsius>(celsius)
}

/// Ambient temperature at a latitude in [K]
pub fn ambient_temperature_k(latitude: f64) -> f64 {
    ambient_temperature(latitude).get::<uom::si::thermodynamic_temperature::kelvin>()
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sea_state_boundaries() {
        assert_eq!(wave_height_to_sea_state(0.05), 0);
        assert_eq!(wave_height_to_sea_state(0.95), 3);
        assert_eq!(wave_height_to_sea_state(15.0), 9);
        assert_eq!(wave_height_to_sea_state(14.999), 8);
    }

    #[test]
    fn sea_state_bound_belongs_to_higher_band() {
        assert_eq!(wave_height_to_sea_state(0.0), 0);
        assert_eq!(wave_height_to_sea_state(0.1), 1);
        assert_eq!(wave_height_to_sea_state(0.3), 2);
        assert_eq!(wave_height_to_sea_state(0.9), 3);
        assert_eq!(wave_height_to_sea_state(1.9), 4);
        assert_eq!(wave_height_to_sea_state(2.5), 4);
        assert_eq!(wave_height_to_sea_state(3.3), 5);
        assert_eq!(wave_height_to_sea_state(5.0), 6);
        assert_eq!(wave_height_to_sea_state(7.5), 7);
        assert_eq!(wave_height_to_sea_state(11.5), 8);
        assert_eq!(wave_height_to_sea_state(40.0), 9);
    }

    #[test]
    fn sea_state_is_monotonic() {
        let mut last = 0;
        for i in 0..2000 {
            let sea_state = wave_height_to_sea_state(i as f64 * 0.01);
            assert!(sea_state >= last);
            assert!(sea_state <= MAX_SEA_STATE);
            last = sea_state;
        }
    }

    #[test]
    fn temperature_at_equator_and_poles() {
        assert_relative_eq!(ambient_temperature_k(0.0), 303.15, epsilon = 1e-9);
        assert_relative_eq!(ambient_temperature_k(90.0), 293.15, epsilon = 1e-9);
        assert_relative_eq!(ambient_temperature_k(-60.0), 298.15, epsilon = 1e-9);
    }

    #[test]
    fn temperature_is_symmetric_about_equator() {
        assert_relative_eq!(ambient_temperature_k(23.4), ambient_temperature_k(-23.4), epsilon = 1e-12);
        assert_relative_eq!(
            ambient_temperature(45.0).get::<uom::si::thermodynamic_temperature::degree_celsius>(),
            20.0 + 10.0 * 45.0_f64.to_radians().cos(),
            epsilon = 1e-9
        );
    }
}
