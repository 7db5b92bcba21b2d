use clap::Parser;
use reqwest::Url;

use crate::{api::ifttt, prelude::*};

#[derive(Parser)]
pub struct IftttArgs {
    /// IFTTT Webhooks key, devices with the `ifttt` protocol are unreachable without it.
    #[clap(long = "ifttt-key", env = "IFTTT_WEBHOOKS_KEY")]
    pub key: Option<String>,

    #[clap(
        long = "ifttt-base-url",
        env = "IFTTT_BASE_URL",
        default_value = ifttt::DEFAULT_BASE_URL
    )]
    pub base_url: Url,
}

impl IftttArgs {
    pub fn try_new_api(&self) -> Result<Option<ifttt::Api>> {
        self.key
            .as_ref()
            .map(|key| ifttt::Api::try_new(self.base_url.clone(), key.clone()))
            .transpose()
    }
}
