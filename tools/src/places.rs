//! Place records and the Places-service HTTP client (spec §6 "Places
//! service (outbound)"), grounded in the teacher's `reqwest`-based external
//! HTTP client usage in `telegram-bot` (rustls-tls + json features, a
//! timeout-bounded `reqwest::Client` built once and reused).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Great-circle distance in kilometers (haversine), used to order
    /// itinerary stops and compute `total_distance_km` (spec §4.6).
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlon = (other.lon - self.lon).to_radians();
        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().asin();
        EARTH_RADIUS_KM * c
    }
}

/// A place record returned by the Places microservice (spec §6 schema).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub address: String,
    pub coordinates: GeoPoint,
    pub rating: f32,
    pub categories: Vec<String>,
    pub opening_hours: Option<String>,
}

#[derive(Error, Debug)]
pub enum PlacesError {
    #[error("places service request failed: {0}")]
    Request(String),
    #[error("places service returned an error status: {0}")]
    Status(u16),
    #[error("places service response could not be parsed: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, PlacesError>;

#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub categories: Vec<String>,
    pub min_rating: Option<f32>,
}

/// HTTP client for `GET /places/search` (spec §6).
#[derive(Clone)]
pub struct PlacesClient {
    http: reqwest::Client,
    base_url: String,
}

impl PlacesClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    pub async fn search(
        &self,
        query: &str,
        city: &str,
        radius: Option<f64>,
        filters: &SearchFilters,
    ) -> Result<Vec<Place>> {
        let url = format!("{}/places/search", self.base_url.trim_end_matches('/'));
        let mut request = self.http.get(url).query(&[("q", query), ("city", city)]);
        if let Some(radius) = radius {
            request = request.query(&[("radius", radius)]);
        }
        if !filters.categories.is_empty() {
            request = request.query(&[("categories", filters.categories.join(","))]);
        }
        if let Some(min_rating) = filters.min_rating {
            request = request.query(&[("min_rating", min_rating)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PlacesError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PlacesError::Status(response.status().as_u16()));
        }

        response
            .json::<Vec<Place>>()
            .await
            .map_err(|e| PlacesError::Parse(e.to_string()))
    }
}
