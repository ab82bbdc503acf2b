use chrono::{DateTime, Duration, Utc};

use crate::abort::AbortFlag;
use crate::predict::error::PredictError;
use crate::predict::pass_finder::PassSource;
use crate::predict::types::PassSchedule;

pub const DEFAULT_HORIZON_HOURS: u32 = 24;
pub const DEFAULT_STEP_HOURS: u32 = 1;

/// Enumerate the distinct passes over `[start, start + horizon_hours)`.
///
/// The source is sampled every `step_hours`; a sample's pass is kept only
/// when it differs from the last kept one. Any propagation error aborts the
/// whole run.
pub fn predict_passes<S: PassSource + ?Sized>(
    source: &S,
    start: DateTime<Utc>,
    horizon_hours: u32,
    step_hours: u32,
    abort: Option<&AbortFlag>,
) -> Result<PassSchedule, PredictError> {
    if horizon_hours == 0 || step_hours == 0 {
        return Err(PredictError::InvalidWindow {
            horizon_hours,
            step_hours,
        });
    }

    let mut schedule = PassSchedule::new();
    let mut samples = 0;

    for offset in (0..horizon_hours).step_by(step_hours as usize) {
        if abort.is_some_and(AbortFlag::is_raised) {
            return Err(PredictError::Aborted { samples });
        }

        let clock = start + Duration::hours(i64::from(offset));
        samples += 1;

        match source.pass_at(clock)? {
            Some(event) => {
                if schedule.push_distinct(event) {
                    log::debug!("sample {}: new pass rising {}", offset, event.rise);
                }
            }
            None => log::debug!("sample {}: no pass in search window", offset),
        }
    }

    log::info!(
        "{} samples over {}h produced {} passes",
        samples,
        horizon_hours,
        schedule.len()
    );
    Ok(schedule)
}
