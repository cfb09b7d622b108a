//! File writing utilities for pipeline artifacts.
//!
//! All writers create their target file fresh and never overwrite: an
//! existing target surfaces as a typed error so the caller can retry under
//! an alternate name. Writers flush before returning.

use crate::error::{Result, TxtStudyError};
use crate::models::{AnalysisRow, MessageRecord};
use csv::Writer;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Write the anonymized record table.
///
/// Columns: `Date`, `Time`, `MessageType`, `Contact`, `Text`, `USC_Date`.
pub fn write_anonymized_csv(records: &[MessageRecord], path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(create_new(path)?);

    writer.write_record(["Date", "Time", "MessageType", "Contact", "Text", "USC_Date"])?;
    for record in records {
        writer.write_record([
            record.date.format("%Y-%m-%d").to_string(),
            record.time.format("%H:%M:%S").to_string(),
            record.message_type.to_string(),
            record.contact.clone(),
            record.text.clone(),
            record.reference_date.format("%Y-%m-%d").to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// Write the per-bucket analysis table, one row per bucket.
///
/// Columns: `PID`, `Month`, `Messages`, `Sent`, `Received`,
/// `Unique Conversations`.
pub fn write_analysis_csv(rows: &[AnalysisRow], path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(create_new(path)?);

    for row in rows {
        writer.serialize(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a single-column name list (review side-files).
pub fn write_name_list(names: &[String], header: &str, path: &Path) -> Result<()> {
    let mut writer = Writer::from_writer(create_new(path)?);

    writer.write_record([header])?;
    for name in names {
        writer.write_record([name.as_str()])?;
    }

    writer.flush()?;
    Ok(())
}

/// Open `path` for writing, failing with [`TxtStudyError::FileExists`] when
/// it is already present.
fn create_new(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                TxtStudyError::FileExists(path.to_path_buf())
            } else {
                e.into()
            }
        })
}
