//! [IFTTT Webhooks](https://ifttt.com/maker_webhooks) activation sink.

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::{
    api::client,
    core::{
        activation::ActivationSink,
        device::{ActivationTarget, DeviceConfig},
        error::ActivationError,
    },
    prelude::*,
};

pub const DEFAULT_BASE_URL: &str = "https://maker.ifttt.com";

pub struct Api {
    client: Client,
    base_url: Url,
    key: String,
}

impl Api {
    pub fn try_new(base_url: Url, key: String) -> Result<Self> {
        Ok(Self { client: client::try_new()?, base_url, key })
    }

    fn trigger_url(&self, event: &str) -> String {
        let base_url = self.base_url.as_str().trim_end_matches('/');
        format!("{base_url}/trigger/{event}/with/key/{}", self.key)
    }
}

#[async_trait]
impl ActivationSink for Api {
    #[instrument(skip_all, fields(device = %device.id, turn_on = turn_on))]
    async fn send(&self, device: &DeviceConfig, turn_on: bool) -> Result<(), ActivationError> {
        let ActivationTarget::Ifttt { on_event, off_event } = &device.target else {
            return Err(ActivationError::Misrouted(device.target.protocol()));
        };
        let event = if turn_on { on_event } else { off_event };
        debug!(event, "triggering…");
        let response = self.client.post(self.trigger_url(event)).send().await?;
        client::acknowledge(&response)
    }
}
