use std::fmt::{Debug, Formatter};

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::core::{clock::TickContext, ranking::HourRanking};

#[derive(
    Clone,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct DeviceId(String);

impl DeviceId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for DeviceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for DeviceId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl Debug for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Set of hours of the day.
#[derive(Copy, Clone, Default, Eq, PartialEq)]
pub struct HourSet(u32);

impl HourSet {
    /// Panics on hours past 23, validate them first.
    #[must_use]
    pub const fn with(self, hour: u8) -> Self {
        assert!(hour < 24);
        Self(self.0 | (1 << hour))
    }

    #[must_use]
    pub const fn contains(self, hour: u8) -> bool {
        hour < 24 && (self.0 & (1 << hour)) != 0
    }

    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0..24).filter(move |hour| self.contains(*hour))
    }
}

impl FromIterator<u8> for HourSet {
    fn from_iter<T: IntoIterator<Item = u8>>(iter: T) -> Self {
        iter.into_iter().fold(Self::default(), Self::with)
    }
}

impl Debug for HourSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// The way a device is switched.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// [IFTTT Webhooks](https://ifttt.com/maker_webhooks) event per state.
    #[default]
    Ifttt,

    /// Plain `POST` to a URL per state.
    Webhook,
}

/// Where the on and off signals of a device go.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ActivationTarget {
    Ifttt { on_event: String, off_event: String },
    Webhook { on_url: Url, off_url: Url },
}

impl ActivationTarget {
    pub const fn protocol(&self) -> Protocol {
        match self {
            Self::Ifttt { .. } => Protocol::Ifttt,
            Self::Webhook { .. } => Protocol::Webhook,
        }
    }
}

/// Validated device settings, read-only for the duration of a tick.
#[derive(Clone, Debug, bon::Builder)]
pub struct DeviceConfig {
    #[builder(into)]
    pub id: DeviceId,

    /// Number of the cheapest hours the device may use, `0..=24`.
    pub budget: u8,

    pub weekday_hours: Option<HourSet>,

    pub weekend_hours: Option<HourSet>,

    pub target: ActivationTarget,
}

impl DeviceConfig {
    /// Whether the device is allowed to run at this hour of the day.
    ///
    /// No hour sets means no restriction. Once either set is configured, a missing set
    /// means the device never runs on that kind of day.
    #[must_use]
    pub fn is_active_slot(&self, hour: u8, weekday: u8) -> bool {
        if self.weekday_hours.is_none() && self.weekend_hours.is_none() {
            return true;
        }
        let hours = if weekday < 5 { self.weekday_hours } else { self.weekend_hours };
        hours.is_some_and(|hours| hours.contains(hour))
    }

    /// The only rule that decides whether the device should be on.
    #[must_use]
    pub fn desired_state(&self, ranking: &HourRanking, context: TickContext) -> bool {
        is_cheap_slot(ranking, self.budget.into(), context.hour)
            && self.is_active_slot(context.hour, context.weekday)
    }
}

/// Whether `hour` is among the first `budget` hours of the ranking.
#[must_use]
pub fn is_cheap_slot(ranking: &HourRanking, budget: usize, hour: u8) -> bool {
    ranking.cheapest(budget).contains(&hour)
}
