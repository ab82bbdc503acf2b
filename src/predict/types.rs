use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// One visibility window: rise, culmination and set instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PassEvent {
    pub rise: DateTime<Utc>,
    pub transit: DateTime<Utc>,
    pub set: DateTime<Utc>,
}

impl PassEvent {
    pub fn duration(&self) -> Duration {
        self.set - self.rise
    }
}

/// Chronologically ordered passes with no two adjacent entries equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PassSchedule {
    passes: Vec<PassEvent>,
}

impl PassSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` unless it equals the last appended event.
    /// Returns whether the event was kept.
    pub fn push_distinct(&mut self, event: PassEvent) -> bool {
        if self.passes.last() == Some(&event) {
            return false;
        }
        self.passes.push(event);
        true
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn as_slice(&self) -> &[PassEvent] {
        &self.passes
    }
}

impl IntoIterator for PassSchedule {
    type Item = PassEvent;
    type IntoIter = std::vec::IntoIter<PassEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.passes.into_iter()
    }
}

impl<'a> IntoIterator for &'a PassSchedule {
    type Item = &'a PassEvent;
    type IntoIter = std::slice::Iter<'a, PassEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.passes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(rise_min: i64) -> PassEvent {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        PassEvent {
            rise: base + Duration::minutes(rise_min),
            transit: base + Duration::minutes(rise_min + 5),
            set: base + Duration::minutes(rise_min + 10),
        }
    }

    #[test]
    fn test_push_distinct_skips_repeat_of_last() {
        let mut schedule = PassSchedule::new();
        assert!(schedule.push_distinct(event(0)));
        assert!(!schedule.push_distinct(event(0)));
        assert!(schedule.push_distinct(event(90)));
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_push_distinct_only_compares_adjacent() {
        let mut schedule = PassSchedule::new();
        schedule.push_distinct(event(0));
        schedule.push_distinct(event(90));
        assert!(schedule.push_distinct(event(0)));
        assert_eq!(schedule.len(), 3);
    }

    #[test]
    fn test_duration() {
        assert_eq!(event(0).duration(), Duration::minutes(10));
    }

    #[test]
    fn test_serializes_as_array() {
        let mut schedule = PassSchedule::new();
        schedule.push_distinct(event(0));
        let json = serde_json::to_value(&schedule).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["rise"], "2024-03-01T00:00:00Z");
    }
}
