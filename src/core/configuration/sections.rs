use serde::Deserialize;

#[derive(Deserialize, Clone, Debug, Default)]
pub struct ApiConfiguration {
    pub backend_url: Option<String>,
    /// request timeout in seconds
    pub timeout: Option<u64>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct PollingConfiguration {
    /// seconds between two status fetches
    pub interval: Option<u64>,
    /// seconds before "return home" becomes available
    pub grace_period: Option<u64>,
    pub auto_return: Option<bool>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct CoreConfiguration {
    pub data_directory: Option<String>,
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct LogConfiguration {
    pub level: Option<String>,
    pub retention: Option<usize>,
}
