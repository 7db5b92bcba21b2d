//! [ESIOS](https://api.esios.ree.es) client for the PVPC day-ahead prices.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::{
    api::{client, price_source::PriceSource},
    core::{error::PriceFetchError, ranking::PricePoint, rate::KilowattHourRate},
    prelude::*,
};

/// Peninsular PVPC zone.
pub const PENINSULA_GEO_ID: u32 = 8741;

pub struct Api {
    client: Client,
    token: String,
    url: Url,
    geo_id: u32,
    timezone: Tz,
}

impl Api {
    pub fn try_new(token: String, url: Url, geo_id: u32, timezone: Tz) -> Result<Self> {
        Ok(Self { client: client::try_new()?, token, url, geo_id, timezone })
    }

    /// Local time of the day in the configured zone.
    fn at(&self, on: NaiveDate, hours: i64) -> DateTime<Tz> {
        let naive = on.and_time(NaiveTime::MIN) + TimeDelta::hours(hours);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive).with_timezone(&self.timezone))
    }
}

#[async_trait]
impl PriceSource for Api {
    #[instrument(skip_all, fields(on = %on))]
    async fn fetch(&self, on: NaiveDate) -> Result<Vec<PricePoint>, PriceFetchError> {
        info!("fetching…");
        let query = [
            ("start_date", self.at(on, 0).to_rfc3339()),
            ("end_date", self.at(on, 23).to_rfc3339()),
            ("geo_ids[]", self.geo_id.to_string()),
        ];
        let values = self
            .client
            .get(self.url.clone())
            .query(&query)
            .header("Accept", "application/json; application/vnd.esios-api-v2+json")
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.token)
            .send()
            .await?
            .error_for_status()?
            .json::<IndicatorResponse>()
            .await?
            .indicator
            .values;
        debug!(n_values = values.len(), "fetched");

        let points: Vec<_> = values
            .into_iter()
            .filter(|value| value.geo_id.is_none_or(|geo_id| geo_id == self.geo_id))
            .filter_map(|value| {
                let local = value.datetime.with_timezone(&self.timezone);
                if local.date_naive() != on {
                    debug!(datetime = %value.datetime, "skipped a value from another day");
                    return None;
                }
                #[expect(clippy::cast_possible_truncation)]
                let hour = local.hour() as u8;
                Some(PricePoint::new(hour, KilowattHourRate::from_megawatt_hour_rate(value.value)))
            })
            .collect();
        if points.is_empty() {
            return Err(PriceFetchError::Malformed(format!("no prices for {on}")));
        }
        info!(n_points = points.len(), "fetched");
        Ok(points)
    }
}

#[derive(Deserialize)]
struct IndicatorResponse {
    indicator: Indicator,
}

#[derive(Deserialize)]
struct Indicator {
    values: Vec<IndicatorValue>,
}

#[derive(Deserialize)]
struct IndicatorValue {
    /// Euros per megawatt-hour.
    value: f64,

    datetime: DateTime<FixedOffset>,

    #[serde(default)]
    geo_id: Option<u32>,
}
