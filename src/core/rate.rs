use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Euro per kilowatt-hour.
#[derive(Copy, Clone, Default, Serialize, Deserialize, derive_more::From, derive_more::FromStr)]
pub struct KilowattHourRate(pub f64);

impl KilowattHourRate {
    /// Fractional digits kept by [`KilowattHourRate::from_megawatt_hour_rate`].
    pub const FRACTIONAL_DIGITS: i32 = 4;

    /// Convert a €/MWh market value, rounding so that floating noise cannot flip the ranking.
    #[must_use]
    pub fn from_megawatt_hour_rate(value: f64) -> Self {
        let scale = 10_f64.powi(Self::FRACTIONAL_DIGITS);
        Self((value / 1000.0 * scale).round() / scale)
    }
}

impl PartialEq for KilowattHourRate {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.0).eq(&OrderedFloat(other.0))
    }
}

impl Eq for KilowattHourRate {}

impl PartialOrd for KilowattHourRate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KilowattHourRate {
    fn cmp(&self, other: &Self) -> Ordering {
        OrderedFloat(self.0).cmp(&OrderedFloat(other.0))
    }
}

impl Display for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4} €/kWh", self.0)
    }
}

impl Debug for KilowattHourRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.4}€/kWh", self.0)
    }
}
