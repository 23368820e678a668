//! Recursive flow smoothing.
//!
//! The smoothed value for a new reading is the mean of the last W
//! *already-smoothed* values, not of the raw readings. Feeding the output
//! back into the window damps volatility faster than a plain moving
//! average, at the cost of extra lag; the raw flow only enters on the
//! bootstrap reading of a sensor.

/// Smoothed flow for a new reading given the window of prior smoothed
/// values (newest first, at most W entries). An empty window bootstraps to
/// the raw flow.
#[must_use]
pub fn smoothed_flow(window: &[f64], raw_flow: f64) -> f64 {
    if window.is_empty() {
        raw_flow
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    }
}

/// Change versus the most recent prior smoothed value; zero on bootstrap.
#[must_use]
pub fn flow_delta(smoothed: f64, prior: Option<f64>) -> f64 {
    prior.map_or(0.0, |p| smoothed - p)
}

/// Flow values are stored as 3-decimal fixed point.
#[must_use]
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstrap_uses_raw_flow() {
        assert_eq!(smoothed_flow(&[], 12.345), 12.345);
        assert_eq!(flow_delta(12.345, None), 0.0);
    }

    #[test]
    fn window_mean_ignores_raw_flow() {
        // The recurrence averages prior smoothed values only.
        let window = [10.0, 20.0, 30.0];
        assert_eq!(smoothed_flow(&window, 999.0), 20.0);
    }

    #[test]
    fn delta_is_signed() {
        assert_eq!(flow_delta(18.0, Some(20.0)), -2.0);
        assert_eq!(flow_delta(22.0, Some(20.0)), 2.0);
    }

    #[test]
    fn rounding_is_three_decimals() {
        assert_eq!(round3(1.23456), 1.235);
        assert_eq!(round3(-0.0004), -0.0);
    }
}
