use crate::geocode::ObserverLocation;

// WGS-84
const EARTH_EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const EARTH_ECCENTRICITY_SQ: f64 = 0.00669437999014;

/// Observer position used by the propagator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundStation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl Default for GroundStation {
    fn default() -> Self {
        Self {
            latitude_deg: 0.0,
            longitude_deg: 0.0,
            altitude_m: 0.0,
        }
    }
}

impl GroundStation {
    pub fn from_observer(observer: &ObserverLocation, altitude_m: Option<f64>) -> Self {
        Self {
            latitude_deg: observer.latitude_deg,
            longitude_deg: observer.longitude_deg,
            altitude_m: altitude_m.unwrap_or(0.0),
        }
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let lat = self.lat_rad();
        let lon = self.lon_rad();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();
        let n = EARTH_EQUATORIAL_RADIUS_KM
            / (1.0 - EARTH_ECCENTRICITY_SQ * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * lon.cos(),
            (n + alt_km) * cos_lat * lon.sin(),
            (n * (1.0 - EARTH_ECCENTRICITY_SQ) + alt_km) * sin_lat,
        ]
    }
}
