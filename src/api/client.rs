use std::time::Duration;

use reqwest::{Client, Response};

use crate::{core::error::ActivationError, prelude::*};

/// Build a default client.
pub fn try_new() -> Result<Client> {
    Ok(Client::builder().timeout(Duration::from_secs(10)).build()?)
}

/// Any 2xx counts as an acknowledgement.
pub fn acknowledge(response: &Response) -> Result<(), ActivationError> {
    let status = response.status();
    if status.is_success() { Ok(()) } else { Err(ActivationError::Status(status.as_u16())) }
}
