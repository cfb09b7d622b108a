//! Analysis pipeline driver.
//!
//! Orchestrates the date window calculator, bucketizer, and aggregator over
//! one record set and shapes the final tabular result. Runs to completion
//! synchronously; a run either produces the whole table or fails outright.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::aggregate::aggregate_buckets;
use crate::error::{Result, TxtStudyError};
use crate::models::{AnalysisRow, MessageRecord};
use crate::window::{
    BucketWindows, DEFAULT_BUCKET_COUNT, DEFAULT_MONTHS_BEFORE, DEFAULT_MONTHS_PER_BUCKET,
};

/// Bucketing pipeline for one participant's record set.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisPipeline {
    bucket_count: usize,
    months_before: u32,
    months_per_bucket: u32,
}

impl Default for AnalysisPipeline {
    fn default() -> Self {
        Self {
            bucket_count: DEFAULT_BUCKET_COUNT,
            months_before: DEFAULT_MONTHS_BEFORE,
            months_per_bucket: DEFAULT_MONTHS_PER_BUCKET,
        }
    }
}

impl AnalysisPipeline {
    /// Create a pipeline with the default eight-bucket layout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pipeline with an explicit window layout.
    #[must_use]
    pub fn with_layout(bucket_count: usize, months_before: u32, months_per_bucket: u32) -> Self {
        Self {
            bucket_count,
            months_before,
            months_per_bucket,
        }
    }

    /// Run the pipeline: one output row per bucket, labeled with the
    /// participant identifier and the bucket's month offset.
    ///
    /// The reference date is read from the record set, where it is constant
    /// across rows. `today` closes the final bucket and is supplied by the
    /// caller so the core stays a pure function of its inputs.
    pub fn run(
        &self,
        records: &[MessageRecord],
        pid: &str,
        today: NaiveDate,
    ) -> Result<Vec<AnalysisRow>> {
        let reference = reference_date(records)?;
        info!(%reference, records = records.len(), "Computing bucket boundaries");

        let windows = BucketWindows::with_layout(
            reference,
            today,
            self.bucket_count,
            self.months_before,
            self.months_per_bucket,
        );

        let aggregates = aggregate_buckets(records, &windows);
        let bucketed: usize = aggregates.iter().map(|a| a.sent + a.received).sum();
        if bucketed < records.len() {
            warn!(
                outside = records.len() - bucketed,
                "Some records fall outside every bucket and were excluded"
            );
        }

        Ok(aggregates.into_iter().map(|a| a.into_row(pid)).collect())
    }
}

/// Reference date of a record set.
///
/// Fails fast on an empty record set; a record set whose rows disagree is
/// reported but the first row wins, matching how the table is produced.
pub fn reference_date(records: &[MessageRecord]) -> Result<NaiveDate> {
    let first = records.first().ok_or_else(|| {
        TxtStudyError::InvalidDate(
            "Cannot determine the reference date of an empty record set".to_string(),
        )
    })?;

    if records
        .iter()
        .any(|r| r.reference_date != first.reference_date)
    {
        warn!("Reference date varies across rows; using the first row's value");
    }

    Ok(first.reference_date)
}
