use std::time::Duration;

use reqwest::{Client, Url};

use crate::prelude::*;

/// Liveness ping after every evaluated tick.
pub struct Heartbeat {
    client: Client,
    url: Url,
}

impl Heartbeat {
    pub fn try_new(url: Url) -> Result<Self> {
        Ok(Self { client: Client::builder().timeout(Duration::from_secs(3)).build()?, url })
    }

    /// Never fails, a lost heartbeat is only worth a warning.
    pub async fn send(&self) {
        if let Err(error) = self.send_fallible().await {
            warn!("failed to send the heartbeat: {error:#}");
        }
    }

    #[instrument(skip_all)]
    async fn send_fallible(&self) -> Result {
        info!("sending a heartbeat…");
        self.client.post(self.url.clone()).send().await?.error_for_status()?;
        Ok(())
    }
}
