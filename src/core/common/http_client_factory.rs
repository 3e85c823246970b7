use std::time::Duration;

use log::debug;
use reqwest::Client;

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Creates the HTTP client used to talk to the verification backend.
///
/// The `timeout` bounds a whole request, connect included.
pub fn http_client_factory(
    timeout: Duration,
) -> Result<Client, Box<dyn std::error::Error + Send + Sync>> {
    debug!("creating HTTP client");

    let client = reqwest::ClientBuilder::new()
        .user_agent(APP_USER_AGENT)
        .timeout(timeout)
        .build()?;

    Ok(client)
}
