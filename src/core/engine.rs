use std::{collections::BTreeMap, pin::pin, sync::Arc, time::Duration};

use chrono::NaiveDate;
use tokio::task::JoinSet;

use crate::{
    api::heartbeat::Heartbeat,
    core::{
        activation::{RetryPolicy, Sinks},
        cache::DailyRankingCache,
        cancellation::{Cancellation, Canceller},
        clock::{Clock, TickContext},
        device::{DeviceConfig, DeviceId},
        error::{ActivationError, ConfigurationError},
        ranking::HourRanking,
    },
    prelude::*,
    store::{DeviceEntry, DeviceStore},
};

/// Runtime state of a registered device.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DeviceState {
    pub is_on: bool,

    /// Number of committed transitions since registration.
    pub n_flips: usize,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[must_use]
pub enum TickOutcome {
    /// Nothing was evaluated, the previous states are kept.
    #[default]
    Skipped,

    Evaluated(TickReport),
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TickReport {
    pub n_devices: usize,
    pub n_misconfigured: usize,
    pub n_flipped: usize,
    pub n_failed: usize,
}

/// Drives the devices according to the cheapest hours of the day.
///
/// Owns the device states exclusively: a state only flips after the activation signal
/// has been acknowledged.
#[derive(bon::Builder)]
pub struct ScheduleEngine {
    cache: Arc<DailyRankingCache>,

    store: Arc<dyn DeviceStore>,

    sinks: Sinks,

    #[builder(default)]
    retry_policy: RetryPolicy,

    /// How long an in-flight tick may keep going after a shutdown request.
    #[builder(default = Duration::from_secs(10))]
    shutdown_grace: Duration,

    heartbeat: Option<Heartbeat>,

    #[builder(skip)]
    states: BTreeMap<DeviceId, DeviceState>,

    /// Ranking of the last seen date.
    #[builder(skip)]
    current: Option<(NaiveDate, Arc<HourRanking>)>,
}

impl ScheduleEngine {
    pub fn state(&self, id: &DeviceId) -> Option<DeviceState> {
        self.states.get(id).copied()
    }

    pub fn current_date(&self) -> Option<NaiveDate> {
        self.current.as_ref().map(|(date, _)| *date)
    }

    /// Tick at every top of the hour until `shutdown` fires.
    ///
    /// A tick that is still retrying when the next hour comes is cut short: its pending
    /// activations are abandoned and the next tick decides on those devices anew.
    pub async fn run(mut self, clock: &dyn Clock, mut shutdown: Cancellation) {
        info!("running…");
        loop {
            let context = clock.context();
            let until_next_hour = clock.until_next_hour();
            let grace = self.shutdown_grace;
            let canceller = Canceller::new();

            let finished = {
                let mut tick = pin!(self.tick(context, canceller.token()));
                tokio::select! {
                    outcome = &mut tick => Some((outcome, false)),
                    () = tokio::time::sleep(until_next_hour) => {
                        warn!("the next hour has come, abandoning the pending activations");
                        canceller.cancel();
                        Some((tick.await, true))
                    }
                    () = shutdown.cancelled() => {
                        info!(?grace, "shutting down, finishing the current tick…");
                        if tokio::time::timeout(grace, &mut tick).await.is_err() {
                            warn!("grace period is over, abandoning the pending activations");
                            canceller.cancel();
                            let _ = tick.await;
                        }
                        None
                    }
                }
            };
            let Some((outcome, is_overdue)) = finished else {
                break;
            };

            if let (TickOutcome::Evaluated(_), Some(heartbeat)) = (outcome, &self.heartbeat) {
                heartbeat.send().await;
            }
            if is_overdue {
                continue;
            }

            let delay = clock.until_next_hour();
            debug!(?delay, "sleeping until the next hour…");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown.cancelled() => break,
            }
        }
        info!("stopped");
    }

    /// Evaluate every device once.
    ///
    /// Waits for every activation to settle. Pending retries stop when `cancellation` fires,
    /// leaving those devices in their previous state.
    #[instrument(
        skip_all,
        fields(
            date = %context.date,
            hour = context.hour,
            weekday = context.weekday,
            is_weekend = context.is_weekend(),
        ),
    )]
    pub async fn tick(&mut self, context: TickContext, cancellation: Cancellation) -> TickOutcome {
        let Some(ranking) = self.ranking_for(context.date).await else {
            return TickOutcome::Skipped;
        };

        let entries = match self.store.load().await {
            Ok(entries) => entries,
            Err(error) => {
                error!("failed to load the devices, skipping the tick: {error:#}");
                return TickOutcome::Skipped;
            }
        };
        self.reconcile(entries.iter().map(|entry| &entry.id));

        let mut report = TickReport { n_devices: entries.len(), ..TickReport::default() };
        let mut transitions = JoinSet::new();
        for DeviceEntry { id, config } in entries {
            let transition = config
                .and_then(|config| self.transition(&ranking, context, config, &cancellation));
            match transition {
                Ok(Some(transition)) => {
                    transitions.spawn(transition);
                }
                Ok(None) => {}
                Err(error) => {
                    warn!(device = %id, "skipping: {error:#}");
                    report.n_misconfigured += 1;
                }
            }
        }

        while let Some(joined) = transitions.join_next().await {
            match joined {
                Ok((id, turn_on, Ok(n_attempts))) => {
                    if let Some(state) = self.states.get_mut(&id) {
                        state.is_on = turn_on;
                        state.n_flips += 1;
                    }
                    info!(device = %id, is_on = turn_on, n_attempts, "switched");
                    report.n_flipped += 1;
                }
                Ok((id, turn_on, Err(error))) => {
                    warn!(device = %id, turn_on, "not switched: {error:#}");
                    report.n_failed += 1;
                }
                Err(error) => {
                    error!("transition task failed: {error:#}");
                    report.n_failed += 1;
                }
            }
        }

        info!(?report, "evaluated");
        TickOutcome::Evaluated(report)
    }

    /// Ranking of the date, refreshed on rollover. `None` when it cannot be fetched.
    async fn ranking_for(&mut self, date: NaiveDate) -> Option<Arc<HourRanking>> {
        if let Some((current_date, ranking)) = &self.current
            && *current_date == date
        {
            return Some(ranking.clone());
        }
        match self.cache.get_or_refresh(date).await {
            Ok(ranking) => {
                self.cache.prune_before(date);
                debug!(n_rankings = self.cache.n_rankings(), "rolled over");
                self.current = Some((date, ranking.clone()));
                Some(ranking)
            }
            Err(error) => {
                error!("failed to refresh the ranking, skipping the tick: {error:#}");
                None
            }
        }
    }

    /// Register the new devices as off and forget the removed ones.
    fn reconcile<'a>(&mut self, ids: impl Iterator<Item = &'a DeviceId>) {
        let mut states = BTreeMap::new();
        for id in ids {
            let state = self.states.remove(id).unwrap_or_else(|| {
                info!(device = %id, "registered");
                DeviceState::default()
            });
            states.insert(id.clone(), state);
        }
        for id in self.states.keys() {
            info!(device = %id, "removed");
        }
        self.states = states;
    }

    /// Prepare the activation of the device if its desired state differs from the current one.
    fn transition(
        &self,
        ranking: &HourRanking,
        context: TickContext,
        config: DeviceConfig,
        cancellation: &Cancellation,
    ) -> Result<
        Option<impl Future<Output = (DeviceId, bool, Result<usize, ActivationError>)> + use<>>,
        ConfigurationError,
    > {
        let is_on = self.states.get(&config.id).is_some_and(|state| state.is_on);
        let turn_on = config.desired_state(ranking, context);
        debug!(device = %config.id, is_on, turn_on);
        if turn_on == is_on {
            return Ok(None);
        }

        let protocol = config.target.protocol();
        let sink =
            self.sinks.get(protocol).ok_or(ConfigurationError::UnsupportedProtocol(protocol))?;
        let policy = self.retry_policy;
        let cancellation = cancellation.clone();
        Ok(Some(async move {
            let result = policy.send(sink.as_ref(), &config, turn_on, cancellation).await;
            (config.id, turn_on, result)
        }))
    }
}
