use clap::Parser;
use reqwest::Url;

use crate::{api::heartbeat::Heartbeat, prelude::*};

#[derive(Parser)]
pub struct HeartbeatArgs {
    #[clap(long = "heartbeat-url", env = "HEARTBEAT_URL")]
    pub url: Option<Url>,
}

impl HeartbeatArgs {
    pub fn try_new(&self) -> Result<Option<Heartbeat>> {
        self.url.clone().map(Heartbeat::try_new).transpose()
    }
}
