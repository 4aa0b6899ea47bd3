//! Display precision
//!
//! Reports must reproduce the exact figures of a bundle, so rounding is done
//! once here rather than by each consumer.

/// Decimals for speeds (m/s)
pub const SPEED_DECIMALS: u32 = 1;
/// Decimals for lactate concentrations (mmol/L)
pub const LACTATE_DECIMALS: u32 = 1;
/// Decimals for efficiency scores
pub const EFFICIENCY_DECIMALS: u32 = 3;
/// Decimals for percent changes
pub const PERCENT_DECIMALS: u32 = 1;
/// Decimals for zone speed bounds
pub const ZONE_SPEED_DECIMALS: u32 = 2;

/// Round half away from zero to a fixed number of decimals
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    // Avoid reporting "-0.0"
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

pub fn speed(value: f64) -> f64 {
    round_to(value, SPEED_DECIMALS)
}

pub fn lactate(value: f64) -> f64 {
    round_to(value, LACTATE_DECIMALS)
}

/// Heart rates are reported as whole beats per minute
pub fn heart_rate(value: f64) -> i64 {
    value.round() as i64
}

pub fn efficiency(value: f64) -> f64 {
    round_to(value, EFFICIENCY_DECIMALS)
}

pub fn percent(value: f64) -> f64 {
    round_to(value, PERCENT_DECIMALS)
}

pub fn zone_speed(value: f64) -> f64 {
    round_to(value, ZONE_SPEED_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(3.14159, 2), 3.14);
        assert_eq!(round_to(2.25, 1), 2.3);
        assert_eq!(round_to(-0.04, 1), 0.0);
        assert!(round_to(-0.04, 1).is_sign_positive());
    }

    #[test]
    fn test_heart_rate_is_integer() {
        assert_eq!(heart_rate(164.5), 165);
        assert_eq!(heart_rate(164.49), 164);
    }

    #[test]
    fn test_display_helpers() {
        assert_eq!(speed(3.4567), 3.5);
        assert_eq!(lactate(1.96), 2.0);
        assert_eq!(efficiency(0.123456), 0.123);
        assert_eq!(percent(-12.345), -12.3);
        assert_eq!(zone_speed(3.0049), 3.0);
    }
}
