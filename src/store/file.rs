use std::{collections::HashSet, path::PathBuf};

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;

use crate::{
    core::{
        device::{ActivationTarget, DeviceConfig, DeviceId, HourSet, Protocol},
        error::ConfigurationError,
    },
    prelude::*,
    store::{DeviceEntry, DeviceStore},
};

/// TOML file with `[[devices]]` tables.
pub struct FileDeviceStore {
    path: PathBuf,
}

impl FileDeviceStore {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl DeviceStore for FileDeviceStore {
    #[instrument(skip_all, fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Vec<DeviceEntry>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read `{}`", self.path.display()))?;
        let entries = parse_devices(&text)?;
        debug!(n_devices = entries.len(), "loaded");
        Ok(entries)
    }
}

/// Parse the device file, validating every device on its own.
fn parse_devices(text: &str) -> Result<Vec<DeviceEntry>> {
    let file: DevicesFile = toml::from_str(text).context("failed to parse the device store")?;
    let mut seen = HashSet::new();
    Ok(file
        .devices
        .into_iter()
        .map(|table| {
            let id = DeviceId::from(
                table.get("id").and_then(toml::Value::as_str).unwrap_or_default(),
            );
            let config = if seen.insert(id.clone()) {
                table
                    .try_into::<DeviceSettings>()
                    .map_err(|error| ConfigurationError::Malformed(error.to_string()))
                    .and_then(DeviceConfig::try_from)
            } else {
                Err(ConfigurationError::DuplicateId(id.clone()))
            };
            DeviceEntry { id, config }
        })
        .collect())
}

#[derive(Deserialize)]
struct DevicesFile {
    #[serde(default)]
    devices: Vec<toml::Value>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeviceSettings {
    id: String,

    budget: i64,

    #[serde(default)]
    protocol: Protocol,

    /// IFTTT event name or webhook URL.
    on: Option<String>,

    /// IFTTT event name or webhook URL.
    off: Option<String>,

    weekday_hours: Option<Vec<i64>>,

    weekend_hours: Option<Vec<i64>>,
}

impl DeviceSettings {
    const DEFAULT_ON_EVENT: &'static str = "pvpc_down";
    const DEFAULT_OFF_EVENT: &'static str = "pvpc_high";

    fn parse_hours(hours: Option<Vec<i64>>) -> Result<Option<HourSet>, ConfigurationError> {
        hours
            .map(|hours| {
                hours
                    .into_iter()
                    .map(|hour| {
                        u8::try_from(hour)
                            .ok()
                            .filter(|hour| *hour < 24)
                            .ok_or(ConfigurationError::Hour(hour))
                    })
                    .collect::<Result<HourSet, _>>()
            })
            .transpose()
    }

    fn parse_url(url: Option<String>) -> Result<Url, ConfigurationError> {
        let url = url.unwrap_or_default();
        Url::parse(&url).map_err(|_| ConfigurationError::WebhookUrl(url))
    }
}

impl TryFrom<DeviceSettings> for DeviceConfig {
    type Error = ConfigurationError;

    fn try_from(settings: DeviceSettings) -> Result<Self, Self::Error> {
        if settings.id.trim().is_empty() {
            return Err(ConfigurationError::EmptyId);
        }
        let budget = u8::try_from(settings.budget)
            .ok()
            .filter(|budget| *budget <= 24)
            .ok_or(ConfigurationError::Budget(settings.budget))?;
        let target = match settings.protocol {
            Protocol::Ifttt => ActivationTarget::Ifttt {
                on_event: settings
                    .on
                    .unwrap_or_else(|| DeviceSettings::DEFAULT_ON_EVENT.to_owned()),
                off_event: settings
                    .off
                    .unwrap_or_else(|| DeviceSettings::DEFAULT_OFF_EVENT.to_owned()),
            },
            Protocol::Webhook => ActivationTarget::Webhook {
                on_url: DeviceSettings::parse_url(settings.on)?,
                off_url: DeviceSettings::parse_url(settings.off)?,
            },
        };
        Ok(Self::builder()
            .id(settings.id)
            .budget(budget)
            .maybe_weekday_hours(DeviceSettings::parse_hours(settings.weekday_hours)?)
            .maybe_weekend_hours(DeviceSettings::parse_hours(settings.weekend_hours)?)
            .target(target)
            .build())
    }
}
