use thiserror::Error;

use crate::core::device::{DeviceId, Protocol};

/// The price feed could not deliver a usable day of prices.
///
/// `Clone` so that every caller waiting on a shared fetch receives the same failure.
#[derive(Clone, Debug, Error)]
pub enum PriceFetchError {
    #[error("failed to call the price feed: {0}")]
    Transport(String),

    #[error("the price feed responded with HTTP {0}")]
    Status(u16),

    #[error("malformed price feed response: {0}")]
    Malformed(String),

    #[error("the price fetch was abandoned before it completed")]
    Abandoned,
}

impl From<reqwest::Error> for PriceFetchError {
    fn from(error: reqwest::Error) -> Self {
        if let Some(status) = error.status() {
            Self::Status(status.as_u16())
        } else if error.is_decode() {
            Self::Malformed(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// A single activation signal was not acknowledged.
#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("failed to send the activation signal: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("the activation endpoint responded with HTTP {0}")]
    Status(u16),

    #[error("gave up after {0} attempts")]
    Exhausted(usize),

    #[error("cancelled after {0} attempts")]
    Cancelled(usize),

    #[error("the sink cannot reach a {0:?} target")]
    Misrouted(Protocol),
}

impl ActivationError {
    /// Whether sending the same signal again may succeed.
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Status(status) => !matches!(*status, 400..=499) || matches!(*status, 408 | 429),
            Self::Misrouted(_) => false,
            Self::Transport(_) | Self::Exhausted(_) | Self::Cancelled(_) => true,
        }
    }
}

/// A device entry in the store is malformed; only that device is affected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("malformed device settings: {0}")]
    Malformed(String),

    #[error("device identifier must not be empty")]
    EmptyId,

    #[error("device `{0}` is defined more than once")]
    DuplicateId(DeviceId),

    #[error("budget {0} is out of range 0..=24")]
    Budget(i64),

    #[error("hour {0} is out of range 0..=23")]
    Hour(i64),

    #[error("`{0}` is not a valid webhook URL")]
    WebhookUrl(String),

    #[error("no activation sink for {0:?}")]
    UnsupportedProtocol(Protocol),
}
