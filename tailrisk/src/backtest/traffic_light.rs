//! Regulatory traffic-light banding
//!
//! Only defined for 99% VaR over roughly one trading year (200..=300 days):
//! 0-4 exceedances green, 5-9 yellow, 10+ red.

use serde::{Deserialize, Serialize};
use std::fmt;

const BANDED_ALPHA: f64 = 0.99;
const ALPHA_TOLERANCE: f64 = 1e-6;
const MIN_OBSERVATIONS: usize = 200;
const MAX_OBSERVATIONS: usize = 300;
const MAX_GREEN: usize = 4;
const MAX_YELLOW: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLight {
    Green,
    Yellow,
    Red,
    #[serde(rename = "n/a")]
    NotApplicable,
}

impl fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
            Self::NotApplicable => "n/a",
        };
        f.write_str(label)
    }
}

/// Band `exceedances` out of `observations` trials at confidence `alpha`
pub fn traffic_light(exceedances: usize, observations: usize, alpha: f64) -> TrafficLight {
    let banded = (alpha - BANDED_ALPHA).abs() < ALPHA_TOLERANCE
        && (MIN_OBSERVATIONS..=MAX_OBSERVATIONS).contains(&observations);
    if !banded {
        return TrafficLight::NotApplicable;
    }
    match exceedances {
        x if x <= MAX_GREEN => TrafficLight::Green,
        x if x <= MAX_YELLOW => TrafficLight::Yellow,
        _ => TrafficLight::Red,
    }
}
