//! Location source adapters.
//!
//! - `fixed`: reports configured coordinates; for headless installs and development.
//! - `http`: asks a local position provider (a GPS daemon bridge, a phone
//!   companion app) for the current fix over HTTP.

use std::sync::Arc;
use std::time::Duration;

use domain::errors::LocationError;
use domain::models::Position;
use domain::services::LocationSource;
use reqwest::{Client, StatusCode};

use crate::config::{LocationConfig, LocationProviderKind};

/// Error type for location provider setup.
#[derive(Debug, thiserror::Error)]
pub enum LocationSetupError {
    #[error("Missing coordinates for the fixed location provider")]
    MissingCoordinates,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the location source selected by configuration.
pub fn build_location_source(
    config: &LocationConfig,
) -> Result<Arc<dyn LocationSource>, LocationSetupError> {
    match config.provider {
        LocationProviderKind::Fixed => {
            let (Some(latitude), Some(longitude)) = (config.latitude, config.longitude) else {
                return Err(LocationSetupError::MissingCoordinates);
            };
            Ok(Arc::new(FixedLocationSource::new(Position::new(
                latitude, longitude,
            ))))
        }
        LocationProviderKind::Http => Ok(Arc::new(HttpLocationSource::new(
            config.url.clone(),
            Duration::from_millis(config.timeout_ms),
        )?)),
    }
}

/// Location source that always reports the same coordinates.
#[derive(Debug, Clone)]
pub struct FixedLocationSource {
    position: Position,
}

impl FixedLocationSource {
    pub fn new(position: Position) -> Self {
        Self { position }
    }
}

#[async_trait::async_trait]
impl LocationSource for FixedLocationSource {
    async fn fetch_current_position(&self) -> Result<Position, LocationError> {
        Ok(self.position)
    }
}

/// Location source backed by an HTTP position provider.
///
/// The provider answers `GET <url>` with `{"latitude": .., "longitude": ..}`.
/// 401 and 403 mean the user refused location access.
pub struct HttpLocationSource {
    client: Client,
    url: String,
}

impl HttpLocationSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait::async_trait]
impl LocationSource for HttpLocationSource {
    async fn fetch_current_position(&self) -> Result<Position, LocationError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            tracing::debug!(url = %self.url, error = %e, "Position provider request failed");
            LocationError::Unavailable(e.to_string())
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(LocationError::PermissionDenied)
            }
            status if !status.is_success() => {
                return Err(LocationError::Unavailable(format!(
                    "position provider returned {}",
                    status
                )))
            }
            _ => {}
        }

        let position: Position = response
            .json()
            .await
            .map_err(|e| LocationError::Unavailable(format!("invalid position payload: {}", e)))?;
        position
            .check_range()
            .map_err(|e| LocationError::Unavailable(e.to_string()))?;

        Ok(position)
    }
}
