use chrono::{DateTime, Utc};

use crate::elements::OrbitalElements;
use crate::predict::error::PredictError;
use crate::predict::propagation::look_angles;
use crate::predict::types::PassEvent;
use crate::predict::GroundStation;

pub const DEFAULT_SCAN_STEP_SECONDS: u32 = 60;
const FORWARD_SEARCH_SECONDS: i64 = 2 * 86_400;
const BACKWARD_SEARCH_SECONDS: i64 = 86_400;
const HORIZON_ELEVATION: f64 = 0.0;

/// Source of rise/transit/set instants for one object and one observer.
pub trait PassSource {
    /// The pass enclosing `at`, or the first one after it.
    ///
    /// `Ok(None)` means the object does not rise (or does not set) within
    /// the source's search window.
    fn pass_at(&self, at: DateTime<Utc>) -> Result<Option<PassEvent>, PredictError>;
}

/// SGP4-backed pass source.
///
/// Crossings are resolved to the whole second, so two clock values that fall
/// in (or before) the same pass yield identical events.
///
/// Visibility is first scanned on a grid of `scan_step` seconds (one minute
/// by default). A pass that starts and ends between two grid points is not
/// seen, so grazing passes shorter than the step can be missed.
pub struct Sgp4PassSource<'a> {
    station: GroundStation,
    elements: &'a OrbitalElements,
    scan_step: i64,
}

impl<'a> Sgp4PassSource<'a> {
    pub fn new(station: GroundStation, elements: &'a OrbitalElements) -> Self {
        Self {
            station,
            elements,
            scan_step: i64::from(DEFAULT_SCAN_STEP_SECONDS),
        }
    }

    /// Use a different scan grid; zero is treated as one second.
    pub fn with_scan_step(mut self, seconds: u32) -> Self {
        self.scan_step = i64::from(seconds.max(1));
        self
    }

    fn elevation(&self, secs: i64) -> Result<f64, PredictError> {
        let timestamp = to_datetime(secs)?;
        Ok(look_angles(&self.station, self.elements, timestamp)?.elevation_deg)
    }

    fn visible(&self, secs: i64) -> Result<bool, PredictError> {
        Ok(self.elevation(secs)? >= HORIZON_ELEVATION)
    }

    fn find_rise(&self, at: i64) -> Result<Option<i64>, PredictError> {
        if self.visible(at)? {
            // Already up: walk back to the start of the enclosing pass.
            let mut above = at;
            let mut cursor = align_down(at, self.scan_step);
            if cursor == at {
                cursor -= self.scan_step;
            }
            let limit = at - BACKWARD_SEARCH_SECONDS;
            while cursor >= limit {
                if !self.visible(cursor)? {
                    return self.first_visible(cursor, above).map(Some);
                }
                above = cursor;
                cursor -= self.scan_step;
            }
            return Ok(None);
        }

        let mut below = at;
        let mut cursor = align_down(at, self.scan_step) + self.scan_step;
        let limit = at + FORWARD_SEARCH_SECONDS;
        while cursor <= limit {
            if self.visible(cursor)? {
                return self.first_visible(below, cursor).map(Some);
            }
            below = cursor;
            cursor += self.scan_step;
        }
        Ok(None)
    }

    fn find_set(&self, rise: i64) -> Result<Option<i64>, PredictError> {
        let mut above = rise;
        let mut cursor = align_down(rise, self.scan_step) + self.scan_step;
        let limit = rise + FORWARD_SEARCH_SECONDS;
        while cursor <= limit {
            if !self.visible(cursor)? {
                return self.first_hidden(above, cursor).map(Some);
            }
            above = cursor;
            cursor += self.scan_step;
        }
        Ok(None)
    }

    /// Smallest second in `(below, above]` at which the object is visible.
    fn first_visible(&self, mut below: i64, mut above: i64) -> Result<i64, PredictError> {
        while above - below > 1 {
            let mid = below + (above - below) / 2;
            if self.visible(mid)? {
                above = mid;
            } else {
                below = mid;
            }
        }
        Ok(above)
    }

    /// Smallest second in `(above, below]` at which the object is hidden.
    fn first_hidden(&self, mut above: i64, mut below: i64) -> Result<i64, PredictError> {
        while below - above > 1 {
            let mid = above + (below - above) / 2;
            if self.visible(mid)? {
                above = mid;
            } else {
                below = mid;
            }
        }
        Ok(below)
    }

    fn find_transit(&self, rise: i64, set: i64) -> Result<i64, PredictError> {
        let mut best = rise;
        let mut best_el = self.elevation(rise)?;
        let mut cursor = rise + self.scan_step;
        while cursor < set {
            let el = self.elevation(cursor)?;
            if el > best_el {
                best = cursor;
                best_el = el;
            }
            cursor += self.scan_step;
        }

        let mut lo = (best - self.scan_step).max(rise);
        let mut hi = (best + self.scan_step).min(set);
        while hi - lo > 2 {
            let m1 = lo + (hi - lo) / 3;
            let m2 = hi - (hi - lo) / 3;
            if self.elevation(m1)? < self.elevation(m2)? {
                lo = m1 + 1;
            } else {
                hi = m2 - 1;
            }
        }

        let mut transit = lo;
        let mut transit_el = self.elevation(lo)?;
        for secs in lo + 1..=hi {
            let el = self.elevation(secs)?;
            if el > transit_el {
                transit = secs;
                transit_el = el;
            }
        }
        Ok(transit)
    }
}

impl PassSource for Sgp4PassSource<'_> {
    fn pass_at(&self, at: DateTime<Utc>) -> Result<Option<PassEvent>, PredictError> {
        let at = at.timestamp();

        let Some(rise) = self.find_rise(at)? else {
            log::debug!("{}: no rise within search window", self.elements.name);
            return Ok(None);
        };
        let Some(set) = self.find_set(rise)? else {
            log::debug!("{}: no set within search window", self.elements.name);
            return Ok(None);
        };
        let transit = self.find_transit(rise, set)?;

        let event = PassEvent {
            rise: to_datetime(rise)?,
            transit: to_datetime(transit)?,
            set: to_datetime(set)?,
        };
        let peak = look_angles(&self.station, self.elements, event.transit)?;
        log::debug!(
            "{}: pass at {} lasting {}s, peak az {:.1} el {:.1} range {:.0} km",
            self.elements.name,
            event.rise,
            event.duration().num_seconds(),
            peak.azimuth_deg,
            peak.elevation_deg,
            peak.range_km
        );
        Ok(Some(event))
    }
}

fn align_down(secs: i64, step: i64) -> i64 {
    secs - secs.rem_euclid(step)
}

fn to_datetime(secs: i64) -> Result<DateTime<Utc>, PredictError> {
    DateTime::from_timestamp(secs, 0).ok_or(PredictError::TimeOutOfRange(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::parse_element_set;
    use chrono::{Duration, TimeZone};

    const ISS_3LE: &str = "0 ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

    fn berlin() -> GroundStation {
        GroundStation {
            latitude_deg: 52.52,
            longitude_deg: 13.405,
            altitude_m: 34.0,
        }
    }

    fn iss() -> OrbitalElements {
        parse_element_set(ISS_3LE, 25544, "ISS (ZARYA)").unwrap()
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 12, 21, 0, 0).unwrap()
    }

    #[test]
    fn test_align_down() {
        assert_eq!(align_down(125, 60), 120);
        assert_eq!(align_down(120, 60), 120);
        assert_eq!(align_down(-1, 60), -60);
        assert_eq!(align_down(125, 10), 120);
    }

    #[test]
    fn test_finer_scan_grid_finds_same_crossings() {
        let elements = iss();
        let coarse = Sgp4PassSource::new(berlin(), &elements);
        let fine = Sgp4PassSource::new(berlin(), &elements).with_scan_step(10);

        let a = coarse.pass_at(epoch()).unwrap().unwrap();
        let b = fine.pass_at(epoch()).unwrap().unwrap();

        assert_eq!(a.rise, b.rise);
        assert_eq!(a.set, b.set);
        assert!((a.transit - b.transit).num_seconds().abs() <= 2);
    }

    #[test]
    fn test_zero_scan_step_is_one_second() {
        let elements = iss();
        let source = Sgp4PassSource::new(berlin(), &elements).with_scan_step(0);
        assert_eq!(source.scan_step, 1);
    }

    #[test]
    fn test_next_pass_is_well_formed() {
        let elements = iss();
        let source = Sgp4PassSource::new(berlin(), &elements);
        let pass = source.pass_at(epoch()).unwrap().expect("ISS rises over Berlin");

        assert!(pass.set > epoch());
        assert!(pass.rise <= pass.transit);
        assert!(pass.transit <= pass.set);
        assert!(pass.duration() > Duration::zero());
        assert!(pass.duration() < Duration::minutes(20));
    }

    #[test]
    fn test_samples_inside_and_before_pass_agree() {
        let elements = iss();
        let source = Sgp4PassSource::new(berlin(), &elements);
        let before = source.pass_at(epoch()).unwrap().unwrap();

        let inside = source
            .pass_at(before.rise + Duration::seconds(37))
            .unwrap()
            .unwrap();
        assert_eq!(before, inside);

        let near_set = source
            .pass_at(before.set - Duration::seconds(2))
            .unwrap()
            .unwrap();
        assert_eq!(before, near_set);
    }

    #[test]
    fn test_sample_after_set_moves_to_next_pass() {
        let elements = iss();
        let source = Sgp4PassSource::new(berlin(), &elements);
        let first = source.pass_at(epoch()).unwrap().unwrap();
        let second = source.pass_at(first.set).unwrap().unwrap();
        assert!(second.rise > first.set);
    }

    #[test]
    fn test_rise_and_set_straddle_horizon() {
        let elements = iss();
        let source = Sgp4PassSource::new(berlin(), &elements);
        let pass = source.pass_at(epoch()).unwrap().unwrap();
        let rise = pass.rise.timestamp();
        let set = pass.set.timestamp();

        assert!(source.elevation(rise).unwrap() >= 0.0);
        assert!(source.elevation(rise - 1).unwrap() < 0.0);
        assert!(source.elevation(set).unwrap() < 0.0);
        assert!(source.elevation(set - 1).unwrap() >= 0.0);

        let transit_el = source.elevation(pass.transit.timestamp()).unwrap();
        assert!(transit_el >= source.elevation(rise).unwrap());
        assert!(transit_el >= source.elevation(set - 1).unwrap());
    }

    #[test]
    fn test_day_of_passes_is_distinct_and_ordered() {
        let elements = iss();
        let source = Sgp4PassSource::new(berlin(), &elements);
        let schedule =
            crate::predict::predict_passes(&source, epoch(), 24, 1, None).unwrap();

        // ISS at 51.6° inclination is seen several times a day from 52.5°N.
        assert!(schedule.len() >= 3);
        for pair in schedule.as_slice().windows(2) {
            assert_ne!(pair[0], pair[1]);
            assert!(pair[0].set < pair[1].rise);
        }

        let again = crate::predict::predict_passes(&source, epoch(), 24, 1, None).unwrap();
        assert_eq!(schedule, again);
    }
}
