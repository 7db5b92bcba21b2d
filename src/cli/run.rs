use std::{num::NonZeroUsize, path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    api::webhook,
    cli::{esios::EsiosArgs, heartbeat::HeartbeatArgs, ifttt::IftttArgs},
    core::{
        activation::{RetryPolicy, ScoutSink, Sinks},
        cache::DailyRankingCache,
        cancellation::Canceller,
        device::Protocol,
        engine::ScheduleEngine,
    },
    prelude::*,
    store::FileDeviceStore,
};

#[derive(Parser)]
pub struct RunArgs {
    /// Do not send the activation signals, only log them (dry run).
    #[clap(long)]
    pub scout: bool,

    /// Device settings file, re-read on every tick.
    #[clap(long = "devices", env = "DEVICES_PATH", default_value = "devices.toml")]
    pub devices_path: PathBuf,

    /// Pause between the activation attempts.
    #[clap(
        long = "activation-retry-interval-secs",
        env = "ACTIVATION_RETRY_INTERVAL_SECS",
        default_value = "1"
    )]
    pub retry_interval_secs: u64,

    /// Give up on a device for the current tick after this many attempts (unbounded by default).
    #[clap(long = "activation-max-attempts", env = "ACTIVATION_MAX_ATTEMPTS")]
    pub max_attempts: Option<NonZeroUsize>,

    /// How long the current tick may keep going after a shutdown request.
    #[clap(long = "shutdown-grace-secs", env = "SHUTDOWN_GRACE_SECS", default_value = "10")]
    pub shutdown_grace_secs: u64,

    #[clap(flatten)]
    pub esios: EsiosArgs,

    #[clap(flatten)]
    pub ifttt: IftttArgs,

    #[clap(flatten)]
    pub heartbeat: HeartbeatArgs,
}

impl RunArgs {
    pub async fn run(self) -> Result {
        let clock = self.esios.clock();
        let engine = ScheduleEngine::builder()
            .cache(Arc::new(DailyRankingCache::new(Box::new(self.esios.try_new_api()?))))
            .store(Arc::new(FileDeviceStore::new(self.devices_path.clone())))
            .sinks(self.sinks()?)
            .retry_policy(
                RetryPolicy::builder()
                    .interval(Duration::from_secs(self.retry_interval_secs))
                    .maybe_max_attempts(self.max_attempts)
                    .build(),
            )
            .shutdown_grace(Duration::from_secs(self.shutdown_grace_secs))
            .maybe_heartbeat(self.heartbeat.try_new()?)
            .build();

        let canceller = Canceller::new();
        let shutdown = canceller.token();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(()) => {
                    info!("received the shutdown signal");
                    canceller.cancel();
                }
                Err(error) => {
                    // The dropped canceller never fires, the engine runs until killed.
                    error!("failed to listen for the shutdown signal: {error:#}");
                }
            }
        });

        engine.run(&clock, shutdown).await;
        Ok(())
    }

    fn sinks(&self) -> Result<Sinks> {
        if self.scout {
            let scout = Arc::new(ScoutSink);
            return Ok(Sinks::default()
                .with(Protocol::Ifttt, scout.clone())
                .with(Protocol::Webhook, scout));
        }
        let sink = Arc::new(webhook::Api::try_new()?);
        let mut sinks = Sinks::default().with(Protocol::Webhook, sink);
        if let Some(ifttt) = self.ifttt.try_new_api()? {
            sinks = sinks.with(Protocol::Ifttt, Arc::new(ifttt));
        } else {
            warn!("no IFTTT key, `ifttt` devices will be reported as misconfigured");
        }
        Ok(sinks)
    }
}

/// SIGINT or SIGTERM.
async fn shutdown_signal() -> Result {
    #[cfg(unix)]
    let mut terminate =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("failed to install the SIGTERM handler")?;

    #[cfg(unix)]
    let terminate = async {
        terminate.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for Ctrl+C")?,
        () = terminate => {},
    }
    Ok(())
}
