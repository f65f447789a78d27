//! Client configuration.

/// Origin of the production service.
pub const DEFAULT_BASE_URL: &str = "https://www.tinkoff.ru";

/// Where the client sends its requests.
///
/// The default targets the production origin; tests point it at a local
/// mock server instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
