//! Geocoding port
//!
//! The mock resolves an address to a stable point near a configured origin:
//! the same address always yields the same coordinates.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use shared::order::Coordinates;
use thiserror::Error;

/// Max offset from the origin, in degrees (roughly 10 km)
const MAX_OFFSET_DEG: f64 = 0.09;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("address could not be resolved: {0}")]
    Unresolvable(String),
    #[error("geocoder unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError>;
}

#[derive(Debug, Clone, Copy)]
pub struct MockGeocoder {
    origin: Coordinates,
}

impl MockGeocoder {
    pub fn new(origin: Coordinates) -> Self {
        Self { origin }
    }
}

#[async_trait]
impl Geocoder for MockGeocoder {
    async fn geocode(&self, address: &str) -> Result<Coordinates, GeocodeError> {
        let normalized = address.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(GeocodeError::Unresolvable("empty address".to_string()));
        }

        let digest = Sha256::digest(normalized.as_bytes());
        let lat = offset(&digest[0..4]);
        let lng = offset(&digest[4..8]);

        Ok(Coordinates {
            lat: self.origin.lat + lat,
            lng: self.origin.lng + lng,
        })
    }
}

/// Map four hash bytes onto [-MAX_OFFSET_DEG, MAX_OFFSET_DEG]
fn offset(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(bytes);
    let unit = f64::from(u32::from_be_bytes(raw)) / f64::from(u32::MAX);
    (unit * 2.0 - 1.0) * MAX_OFFSET_DEG
}
