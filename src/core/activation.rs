use std::{collections::HashMap, num::NonZeroUsize, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    core::{
        cancellation::Cancellation,
        device::{DeviceConfig, Protocol},
        error::ActivationError,
    },
    prelude::*,
};

/// Sends on/off signals to devices.
///
/// Sending the same signal twice must be harmless.
#[async_trait]
pub trait ActivationSink: Send + Sync {
    async fn send(&self, device: &DeviceConfig, turn_on: bool) -> Result<(), ActivationError>;
}

/// Only logs the signals, for dry runs.
pub struct ScoutSink;

#[async_trait]
impl ActivationSink for ScoutSink {
    async fn send(&self, device: &DeviceConfig, turn_on: bool) -> Result<(), ActivationError> {
        info!(device = %device.id, turn_on, "scouting, not sending");
        Ok(())
    }
}

/// Activation sinks keyed by protocol.
#[derive(Clone, Default)]
pub struct Sinks(HashMap<Protocol, Arc<dyn ActivationSink>>);

impl Sinks {
    #[must_use]
    pub fn with(mut self, protocol: Protocol, sink: Arc<dyn ActivationSink>) -> Self {
        self.0.insert(protocol, sink);
        self
    }

    pub fn get(&self, protocol: Protocol) -> Option<Arc<dyn ActivationSink>> {
        self.0.get(&protocol).cloned()
    }
}

/// Fixed-interval retry of the activation signal.
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct RetryPolicy {
    #[builder(default = Duration::from_secs(1))]
    pub interval: Duration,

    /// Unbounded when absent.
    pub max_attempts: Option<NonZeroUsize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl RetryPolicy {
    /// Send until acknowledged, returning the number of attempts made.
    ///
    /// Stops early when the attempts are exhausted, `cancellation` fires,
    /// or the signal is rejected for good.
    #[instrument(skip_all, fields(device = %device.id, turn_on))]
    pub async fn send(
        self,
        sink: &dyn ActivationSink,
        device: &DeviceConfig,
        turn_on: bool,
        mut cancellation: Cancellation,
    ) -> Result<usize, ActivationError> {
        let mut n_attempts = 0;
        loop {
            if cancellation.is_cancelled() {
                return Err(ActivationError::Cancelled(n_attempts));
            }
            n_attempts += 1;
            match sink.send(device, turn_on).await {
                Ok(()) => return Ok(n_attempts),
                Err(error) if !error.is_transient() => {
                    warn!(n_attempts, "rejected, not retrying: {error:#}");
                    return Err(error);
                }
                Err(error) => {
                    warn!(n_attempts, "failed to send the activation signal: {error:#}");
                }
            }
            if self.max_attempts.is_some_and(|max_attempts| n_attempts >= max_attempts.get()) {
                return Err(ActivationError::Exhausted(n_attempts));
            }
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = cancellation.cancelled() => {
                    return Err(ActivationError::Cancelled(n_attempts));
                }
            }
        }
    }
}
