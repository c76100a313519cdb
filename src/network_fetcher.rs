use reqwest::{Client, Url};

use crate::config::DashboardConfig;
use crate::error::LoadError;
use crate::network::NetworkDataset;

/// Absolute url of the network file; relative paths need `base_url`.
pub fn resolve_source_url(config: &DashboardConfig) -> Result<Url, LoadError> {
    let resolved = match config.base_url.as_deref() {
        // An absolute source_url replaces the base entirely
        Some(base) => Url::parse(base).and_then(|base| base.join(&config.source_url)),
        None => Url::parse(&config.source_url),
    };
    resolved.map_err(|e| LoadError::InvalidSourceUrl(format!("{}: {}", config.source_url, e)))
}

/// Downloads the raw network file.
pub async fn fetch_network_payload(url: Url) -> Result<Vec<u8>, LoadError> {
    let unavailable = |e: reqwest::Error| LoadError::SourceUnavailable {
        source_url: url.to_string(),
        reason: e.to_string(),
    };

    let client = Client::new();
    let response = client
        .get(url.clone())
        .send()
        .await
        .and_then(|response| response.error_for_status())
        .map_err(unavailable)?;
    let bytes = response.bytes().await.map_err(unavailable)?;

    log::info!("Fetched {} bytes of road network from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

pub async fn load_network(config: &DashboardConfig) -> Result<NetworkDataset, LoadError> {
    let url = resolve_source_url(config)?;
    let payload = fetch_network_payload(url).await?;
    NetworkDataset::load(&payload)
}
