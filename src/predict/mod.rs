mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod schedule;
mod types;

pub use error::PredictError;
pub use ground_station::GroundStation;
pub use pass_finder::{Sgp4PassSource, DEFAULT_SCAN_STEP_SECONDS};
pub use schedule::{predict_passes, DEFAULT_HORIZON_HOURS, DEFAULT_STEP_HOURS};
pub use types::{PassEvent, PassSchedule};
