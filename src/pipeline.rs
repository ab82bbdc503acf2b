//! Satellite → elements → observer → passes, without any console I/O.
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::abort::AbortFlag;
use crate::catalog::{resolve_with_selection, CatalogEntry, CatalogError, ResolveError};
use crate::elements::{fetch_elements, FetchError, OrbitalElements};
use crate::geocode::{resolve_observer, GeocodeError, Geocoder, ObserverLocation};
use crate::predict::{predict_passes, GroundStation, PassSchedule, PredictError, Sgp4PassSource};
use crate::spacetrack::ElementSource;

/// Every way a prediction run can end without a schedule.
#[derive(Debug, Error, strum_macros::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunError {
    #[error("satellite catalog unavailable: {0}")]
    CatalogUnavailable(#[from] CatalogError),
    #[error("{0}")]
    NoMatch(String),
    #[error("invalid satellite selection: {0}")]
    AmbiguousSelectionInvalid(ResolveError),
    #[error("{0}")]
    ElementFetchMalformed(FetchError),
    #[error("{0}")]
    ElementFetchFailed(FetchError),
    #[error("{0}")]
    GeocodeFailed(#[from] GeocodeError),
    #[error("unable to calculate times: {0}")]
    PropagationFailure(PredictError),
    #[error("{0}")]
    InvalidWindow(PredictError),
    #[error("{0}")]
    Aborted(PredictError),
}

impl RunError {
    /// Stable snake_case label for logs and machine-readable output.
    pub fn kind(&self) -> &str {
        self.as_ref()
    }
}

impl From<ResolveError> for RunError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound(_) => RunError::NoMatch(err.to_string()),
            other => RunError::AmbiguousSelectionInvalid(other),
        }
    }
}

impl From<FetchError> for RunError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::EmptyOrMalformed { .. } => RunError::ElementFetchMalformed(err),
            FetchError::Network(_) => RunError::ElementFetchFailed(err),
        }
    }
}

impl From<PredictError> for RunError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::Aborted { .. } => RunError::Aborted(err),
            PredictError::InvalidWindow { .. } => RunError::InvalidWindow(err),
            other => RunError::PropagationFailure(other),
        }
    }
}

/// Everything a run needs from the operator, already collected.
#[derive(Debug, Clone)]
pub struct PassRequest {
    pub satellite_query: String,
    pub selection: Option<usize>,
    pub location_query: String,
    pub altitude_m: Option<f64>,
    pub start: DateTime<Utc>,
    pub horizon_hours: u32,
    pub step_hours: u32,
    pub scan_step_seconds: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassReport {
    pub satellite: CatalogEntry,
    pub epoch: DateTime<Utc>,
    pub observer: ObserverLocation,
    pub start: DateTime<Utc>,
    pub horizon_hours: u32,
    pub passes: PassSchedule,
}

impl PassReport {
    pub fn new(
        entry: &CatalogEntry,
        elements: &OrbitalElements,
        observer: ObserverLocation,
        request: &PassRequest,
        passes: PassSchedule,
    ) -> Self {
        Self {
            satellite: entry.clone(),
            epoch: elements.epoch(),
            observer,
            start: request.start,
            horizon_hours: request.horizon_hours,
            passes,
        }
    }
}

pub fn select_satellite<'a>(
    catalog: &'a [CatalogEntry],
    query: &str,
    selection: Option<usize>,
) -> Result<&'a CatalogEntry, RunError> {
    let entry = resolve_with_selection(query, catalog, selection)?;
    log::info!("Satellite: {} ({})", entry.name, entry.norad_id);
    Ok(entry)
}

pub fn locate_observer<G: Geocoder + ?Sized>(
    geocoder: &G,
    query: &str,
) -> Result<ObserverLocation, RunError> {
    let location = resolve_observer(geocoder, query)?
        .ok_or_else(|| RunError::NoMatch(format!("no place matches '{}'", query)))?;
    log::info!(
        "Observer: {} ({:.4}, {:.4})",
        location.display_name,
        location.latitude_deg,
        location.longitude_deg
    );
    Ok(location)
}

pub fn compute_schedule(
    elements: &OrbitalElements,
    observer: &ObserverLocation,
    request: &PassRequest,
    abort: Option<&AbortFlag>,
) -> Result<PassSchedule, RunError> {
    let station = GroundStation::from_observer(observer, request.altitude_m);
    let source =
        Sgp4PassSource::new(station, elements).with_scan_step(request.scan_step_seconds);
    Ok(predict_passes(
        &source,
        request.start,
        request.horizon_hours,
        request.step_hours,
        abort,
    )?)
}

/// Run the whole chain for a request whose selection is already known.
pub fn run<E, G>(
    catalog: &[CatalogEntry],
    elements_source: &E,
    geocoder: &G,
    request: &PassRequest,
    abort: Option<&AbortFlag>,
) -> Result<PassReport, RunError>
where
    E: ElementSource + ?Sized,
    G: Geocoder + ?Sized,
{
    let entry = select_satellite(catalog, &request.satellite_query, request.selection)?;
    let elements = fetch_elements(elements_source, entry)?;
    let observer = locate_observer(geocoder, &request.location_query)?;
    let passes = compute_schedule(&elements, &observer, request, abort)?;

    Ok(PassReport::new(entry, &elements, observer, request, passes))
}
