//! Deadline resolution and time sensitivity
//!
//! Relative deadlines count from the process anchor when the extractor found
//! one (an absolute deadline marked `anchors_process`), otherwise from the
//! reference timestamp. With several anchors the earliest wins.

use chrono::{DateTime, NaiveDate, Utc};
use docplan_extract::{Deadline, ExtractedEntity};

/// Earliest process anchor among `entities`
#[must_use]
pub fn process_anchor<'a>(entities: impl IntoIterator<Item = &'a ExtractedEntity>) -> Option<NaiveDate> {
    entities
        .into_iter()
        .filter_map(ExtractedEntity::as_deadline)
        .filter(|d| d.anchors_process)
        .filter_map(|d| match d.timing {
            docplan_extract::DeadlineTiming::Absolute { date } => Some(date),
            docplan_extract::DeadlineTiming::Relative { .. } => None,
        })
        .min()
}

/// Resolves deadlines for one document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineClock {
    reference: DateTime<Utc>,
    anchor: Option<NaiveDate>,
    window_days: i64,
}

impl DeadlineClock {
    /// Clock at `reference` with a time-sensitivity window
    #[inline]
    #[must_use]
    pub fn new(reference: DateTime<Utc>, window_days: u32) -> Self {
        Self {
            reference,
            anchor: None,
            window_days: i64::from(window_days),
        }
    }

    /// With process anchor
    #[inline]
    #[must_use]
    pub fn with_anchor(mut self, anchor: Option<NaiveDate>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Process anchor in effect
    #[inline]
    #[must_use]
    pub fn anchor(&self) -> Option<NaiveDate> {
        self.anchor
    }

    /// Calendar date of a deadline; `None` if it overflows the calendar
    #[inline]
    #[must_use]
    pub fn resolve(&self, deadline: &Deadline) -> Option<NaiveDate> {
        deadline.resolve(self.reference, self.anchor)
    }

    /// Whole days from the reference date to `date`; negative when overdue
    #[inline]
    #[must_use]
    pub fn days_until(&self, date: NaiveDate) -> i64 {
        (date - self.reference.date_naive()).num_days()
    }

    /// Inclusive window test; overdue dates are time-sensitive too
    #[inline]
    #[must_use]
    pub fn is_time_sensitive(&self, date: NaiveDate) -> bool {
        self.days_until(date) <= self.window_days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use docplan_extract::EntityKind;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 18, 30, 0).unwrap()
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    #[test]
    fn window_is_inclusive_at_thirty_days() {
        let clock = DeadlineClock::new(reference(), 30);
        assert_eq!(clock.days_until(date(1, 31)), 30);
        assert!(clock.is_time_sensitive(date(1, 31)));
        assert!(!clock.is_time_sensitive(date(2, 1)));
    }

    #[test]
    fn overdue_is_time_sensitive() {
        let clock = DeadlineClock::new(reference(), 30);
        assert!(clock.is_time_sensitive(date(1, 1)));
        assert_eq!(clock.days_until(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()), -7);
    }

    #[test]
    fn earliest_anchor_wins() {
        let entities = [
            ExtractedEntity::new("a", "start", EntityKind::Deadline(Deadline::anchor(date(3, 1)))),
            ExtractedEntity::new("b", "other", EntityKind::Deadline(Deadline::absolute(date(1, 5)))),
            ExtractedEntity::new("c", "start", EntityKind::Deadline(Deadline::anchor(date(2, 1)))),
        ];
        assert_eq!(process_anchor(&entities), Some(date(2, 1)));

        let clock = DeadlineClock::new(reference(), 30).with_anchor(process_anchor(&entities));
        assert_eq!(clock.resolve(&Deadline::relative(14)), Some(date(2, 15)));
    }

    #[test]
    fn relative_without_anchor_counts_from_reference() {
        let clock = DeadlineClock::new(reference(), 30);
        assert_eq!(clock.resolve(&Deadline::relative(30)), Some(date(1, 31)));
    }
}
