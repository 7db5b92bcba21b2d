use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use clap::Parser;
use reqwest::Url;

use crate::{api::esios, core::clock::ZonedClock, prelude::*};

#[derive(Parser)]
pub struct EsiosArgs {
    /// Civil time zone of the tariff: hours and dates are local to it.
    #[clap(long, env = "TIMEZONE", default_value = "Europe/Madrid")]
    pub timezone: Tz,

    #[clap(long = "esios-token", env = "ESIOS_TOKEN")]
    pub token: String,

    /// PVPC indicator endpoint.
    #[clap(
        long = "esios-url",
        env = "ESIOS_URL",
        default_value = "https://api.esios.ree.es/indicators/1001"
    )]
    pub url: Url,

    /// Geographic zone of the prices, the peninsula by default.
    #[clap(
        long = "esios-geo-id",
        env = "ESIOS_GEO_ID",
        default_value_t = esios::PENINSULA_GEO_ID
    )]
    pub geo_id: u32,
}

impl EsiosArgs {
    pub fn try_new_api(&self) -> Result<esios::Api> {
        esios::Api::try_new(self.token.clone(), self.url.clone(), self.geo_id, self.timezone)
    }

    pub const fn clock(&self) -> ZonedClock {
        ZonedClock(self.timezone)
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}
