use async_trait::async_trait;
use reqwest::Client;

use crate::{
    api::client,
    core::{
        activation::ActivationSink,
        device::{ActivationTarget, DeviceConfig},
        error::ActivationError,
    },
    prelude::*,
};

/// Plain `POST` to the device's on or off URL.
pub struct Api(Client);

impl Api {
    pub fn try_new() -> Result<Self> {
        Ok(Self(client::try_new()?))
    }
}

#[async_trait]
impl ActivationSink for Api {
    #[instrument(skip_all, fields(device = %device.id, turn_on = turn_on))]
    async fn send(&self, device: &DeviceConfig, turn_on: bool) -> Result<(), ActivationError> {
        let ActivationTarget::Webhook { on_url, off_url } = &device.target else {
            return Err(ActivationError::Misrouted(device.target.protocol()));
        };
        let url = if turn_on { on_url } else { off_url };
        debug!(%url, "posting…");
        let response = self.0.post(url.clone()).send().await?;
        client::acknowledge(&response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::activation::tests::device;

    fn relay(server: &mockito::Server) -> Result<DeviceConfig> {
        Ok(DeviceConfig::builder()
            .id("relay")
            .budget(3)
            .target(ActivationTarget::Webhook {
                on_url: format!("{}/relay/on", server.url()).parse()?,
                off_url: format!("{}/relay/off", server.url()).parse()?,
            })
            .build())
    }

    #[tokio::test]
    async fn send_ok() -> Result {
        let mut server = mockito::Server::new_async().await;
        let on = server.mock("POST", "/relay/on").with_status(204).create_async().await;
        let off = server.mock("POST", "/relay/off").with_status(200).create_async().await;
        let relay = relay(&server)?;
        let api = Api::try_new()?;

        api.send(&relay, true).await?;
        api.send(&relay, false).await?;

        on.assert_async().await;
        off.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn send_server_error() -> Result {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("POST", "/relay/on").with_status(500).create_async().await;

        let error = Api::try_new()?.send(&relay(&server)?, true).await.unwrap_err();
        assert!(matches!(error, ActivationError::Status(500)), "{error:?}");
        Ok(())
    }

    #[tokio::test]
    async fn send_misrouted() -> Result {
        let error = Api::try_new()?.send(&device("boiler"), true).await.unwrap_err();
        assert!(matches!(error, ActivationError::Misrouted(_)), "{error:?}");
        Ok(())
    }
}
