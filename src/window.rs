//! Date window computation for time-bucket analysis.
//!
//! Turns a reference date into a fixed set of month-aligned bucket
//! boundaries and answers which bucket a given date falls into. Also hosts
//! the retention predicate applied when ingesting raw exports.

use chrono::{Months, NaiveDate};

/// Default number of buckets around the reference date
pub const DEFAULT_BUCKET_COUNT: usize = 8;
/// Default number of months before the reference date the window opens
pub const DEFAULT_MONTHS_BEFORE: u32 = 3;
/// Default width of one bucket, in months
pub const DEFAULT_MONTHS_PER_BUCKET: u32 = 1;

/// Shift a date by a signed number of calendar months.
///
/// Day-of-month is clamped the way `chrono::Months` defines it
/// (Jan 31 + 1 month = Feb 28/29).
#[must_use]
pub fn shift_months(date: NaiveDate, months: i32) -> NaiveDate {
    if months >= 0 {
        date + Months::new(months.unsigned_abs())
    } else {
        date - Months::new(months.unsigned_abs())
    }
}

/// An ordered set of bucket boundaries partitioning time into half-open
/// intervals `[boundary[i], boundary[i+1])`.
///
/// The first `bucket_count` boundaries are strictly increasing. The trailing
/// boundary is the run date; when the run date precedes the last computed
/// boundary the final bucket is empty. That trailing behavior is inherited
/// and kept as-is.
#[derive(Debug, Clone)]
pub struct BucketWindows {
    boundaries: Vec<NaiveDate>,
    months_before: u32,
}

impl BucketWindows {
    /// Compute boundaries with the default layout: eight one-month buckets
    /// starting three months before the reference date, closed by `today`.
    #[must_use]
    pub fn compute(reference: NaiveDate, today: NaiveDate) -> Self {
        Self::with_layout(
            reference,
            today,
            DEFAULT_BUCKET_COUNT,
            DEFAULT_MONTHS_BEFORE,
            DEFAULT_MONTHS_PER_BUCKET,
        )
    }

    /// Compute boundaries with an explicit layout.
    #[must_use]
    pub fn with_layout(
        reference: NaiveDate,
        today: NaiveDate,
        bucket_count: usize,
        months_before: u32,
        months_per_bucket: u32,
    ) -> Self {
        let start = reference - Months::new(months_before);
        let mut boundaries: Vec<NaiveDate> = (0..bucket_count)
            .map(|i| start + Months::new(i as u32 * months_per_bucket))
            .collect();
        boundaries.push(today);

        Self {
            boundaries,
            months_before,
        }
    }

    /// All boundaries, in order.
    #[must_use]
    pub fn boundaries(&self) -> &[NaiveDate] {
        &self.boundaries
    }

    /// Number of buckets (one less than the boundary count).
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Start boundary of the bucket at `index`.
    #[must_use]
    pub fn bucket_start(&self, index: usize) -> NaiveDate {
        self.boundaries[index]
    }

    /// Month offset of the bucket at `index` relative to the reference date.
    ///
    /// With the default layout the offsets run -3 through +4.
    #[must_use]
    pub fn month_offset(&self, index: usize) -> i32 {
        index as i32 - self.months_before as i32
    }

    /// Find the bucket containing `date`.
    ///
    /// Scans boundaries in order and returns the first `i` with
    /// `boundary[i] <= date < boundary[i+1]`. A date equal to a boundary
    /// falls in the bucket that boundary opens. Returns `None` when the date
    /// lies outside every interval.
    #[must_use]
    pub fn bucket_index(&self, date: NaiveDate) -> Option<usize> {
        (0..self.bucket_count())
            .find(|&i| self.boundaries[i] <= date && date < self.boundaries[i + 1])
    }
}

/// Whether a record dated `date` is retained when ingesting a raw export.
///
/// Keeps the event window (`months_around` months either side of the
/// reference date, plus one trailing month) and the `past_months` leading up
/// to the run date.
#[must_use]
pub fn within_retention(
    date: NaiveDate,
    reference: NaiveDate,
    today: NaiveDate,
    months_around: u32,
    past_months: u32,
) -> bool {
    let start = reference - Months::new(months_around);
    let end = reference + Months::new(months_around + 1);
    let recent_start = today - Months::new(past_months);

    (date >= start && date <= end) || (date >= recent_start && date <= today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_layout_boundaries() {
        let windows = BucketWindows::compute(date(2024, 7, 1), date(2025, 6, 15));
        let boundaries = windows.boundaries();

        assert_eq!(boundaries.len(), 9);
        assert_eq!(windows.bucket_count(), 8);
        assert_eq!(boundaries[0], date(2024, 4, 1));
        assert_eq!(boundaries[3], date(2024, 7, 1));
        assert_eq!(boundaries[7], date(2024, 11, 1));
        assert_eq!(boundaries[8], date(2025, 6, 15));
    }

    #[test]
    fn test_month_offsets() {
        let windows = BucketWindows::compute(date(2024, 7, 1), date(2025, 6, 15));
        let offsets: Vec<i32> = (0..windows.bucket_count())
            .map(|i| windows.month_offset(i))
            .collect();
        assert_eq!(offsets, vec![-3, -2, -1, 0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_bucket_index_boundary_opens_not_closes() {
        let windows = BucketWindows::compute(date(2024, 7, 1), date(2025, 6, 15));
        // A date exactly on a boundary belongs to the bucket it opens.
        assert_eq!(windows.bucket_index(date(2024, 7, 1)), Some(3));
        assert_eq!(windows.bucket_index(date(2024, 6, 30)), Some(2));
    }

    #[test]
    fn test_bucket_index_outside_window() {
        let windows = BucketWindows::compute(date(2024, 7, 1), date(2025, 6, 15));
        assert_eq!(windows.bucket_index(date(2024, 3, 31)), None);
        assert_eq!(windows.bucket_index(date(2025, 6, 15)), None);
    }

    #[test]
    fn test_trailing_boundary_before_last_computed() {
        // Run date earlier than the seventh computed boundary: the final
        // bucket is inverted and simply matches nothing.
        let windows = BucketWindows::compute(date(2024, 7, 1), date(2024, 9, 15));
        assert_eq!(windows.boundaries().len(), 9);
        assert_eq!(windows.bucket_index(date(2024, 12, 25)), None);
    }

    #[test]
    fn test_shift_months_clamps_day() {
        assert_eq!(shift_months(date(2024, 1, 31), 1), date(2024, 2, 29));
        assert_eq!(shift_months(date(2024, 7, 1), -3), date(2024, 4, 1));
    }

    #[test]
    fn test_within_retention() {
        let reference = date(2024, 7, 1);
        let today = date(2025, 6, 15);
        // Inside the event window.
        assert!(within_retention(date(2024, 5, 10), reference, today, 3, 1));
        // Trailing month edge of the event window.
        assert!(within_retention(date(2024, 11, 1), reference, today, 3, 1));
        // Recent month before the run date.
        assert!(within_retention(date(2025, 6, 1), reference, today, 3, 1));
        // In the gap between event window and recent month.
        assert!(!within_retention(date(2025, 2, 1), reference, today, 3, 1));
    }
}
