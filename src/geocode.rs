//! Place-name resolution through a geocoding service.
use reqwest::blocking::Client;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::http::HttpPolicy;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

/// A resolved observer position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObserverLocation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub display_name: String,
}

/// One search hit as returned by the service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Place {
    #[serde(deserialize_with = "deserialize_degrees")]
    pub lat: f64,
    #[serde(deserialize_with = "deserialize_degrees")]
    pub lon: f64,
    pub display_name: String,
}

pub trait Geocoder {
    fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError>;
}

/// Resolve `query` to the first place the service returns.
///
/// `"<lat>,<lon>"` is taken literally without asking the service.
pub fn resolve_observer<G: Geocoder + ?Sized>(
    geocoder: &G,
    query: &str,
) -> Result<Option<ObserverLocation>, GeocodeError> {
    if let Some(location) = parse_coordinates(query) {
        return Ok(Some(location));
    }

    let places = geocoder.search(query)?;
    let Some(first) = places.into_iter().next() else {
        log::info!("No place found for '{}'", query);
        return Ok(None);
    };

    validate_degrees(first.lat, first.lon)?;
    Ok(Some(ObserverLocation {
        latitude_deg: first.lat,
        longitude_deg: first.lon,
        display_name: first.display_name,
    }))
}

pub fn parse_coordinates(query: &str) -> Option<ObserverLocation> {
    let parts: Vec<_> = query.split(',').map(|s| s.trim()).collect();
    if parts.len() != 2 {
        return None;
    }
    let lat: f64 = parts[0].parse().ok()?;
    let lon: f64 = parts[1].parse().ok()?;
    validate_degrees(lat, lon).ok()?;
    Some(ObserverLocation {
        latitude_deg: lat,
        longitude_deg: lon,
        display_name: format!("{:.4}, {:.4}", lat, lon),
    })
}

fn validate_degrees(lat: f64, lon: f64) -> Result<(), GeocodeError> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(GeocodeError::Malformed(format!(
            "coordinates out of range: {}, {}",
            lat, lon
        )));
    }
    Ok(())
}

fn deserialize_degrees<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(v) => Ok(v),
        Repr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// OpenStreetMap Nominatim search client.
pub struct NominatimClient {
    client: Client,
    policy: HttpPolicy,
    base_url: String,
}

impl NominatimClient {
    pub fn new(base_url: &str, policy: HttpPolicy, user_agent: &str) -> Result<Self, GeocodeError> {
        Ok(Self {
            client: policy.build_client(user_agent)?,
            policy,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn search_url(&self, query: &str) -> String {
        format!(
            "{}/search?q={}&format=json&limit=1",
            self.base_url,
            urlencoding::encode(query.trim())
        )
    }
}

impl Geocoder for NominatimClient {
    fn search(&self, query: &str) -> Result<Vec<Place>, GeocodeError> {
        let url = self.search_url(query);
        log::debug!("geocode: {}", url);
        let body = self
            .policy
            .send("geocode", || self.client.get(&url))?
            .text()?;
        parse_places(&body)
    }
}

fn parse_places(body: &str) -> Result<Vec<Place>, GeocodeError> {
    serde_json::from_str(body).map_err(|e| GeocodeError::Malformed(e.to_string()))
}
