//! CSV ingestion and device-export normalization.
//!
//! Raw iPhone and Android exports use different column names, type codes,
//! and timestamp formats; everything is normalized into the canonical
//! record schema here. Missing required columns and unparsable cells fail
//! fast with typed errors naming the column and row.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::StringRecord;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

use crate::error::{Result, TxtStudyError};
use crate::models::{MessageRecord, MessageType};
use crate::window::within_retention;

/// Columns every canonical record table must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = ["Date", "Time", "MessageType", "Contact", "Text", "USC_Date"];

/// Kind of device export being ingested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKind {
    /// iMazing-style iPhone export
    Iphone,
    /// SMS Backup & Restore-style Android export
    Android,
    /// Already-normalized table without a reference-date column
    Generic,
}

impl FromStr for DeviceKind {
    type Err = TxtStudyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "iphone" => Ok(Self::Iphone),
            "android" => Ok(Self::Android),
            "generic" => Ok(Self::Generic),
            other => Err(TxtStudyError::Other(format!(
                "Unknown device kind: {other} (expected iphone, android, or generic)"
            ))),
        }
    }
}

/// Read a canonical record table, reference-date column included.
pub fn read_records(path: &Path) -> Result<Vec<MessageRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let date_idx = column_index(&headers, "Date")?;
    let time_idx = column_index(&headers, "Time")?;
    let type_idx = column_index(&headers, "MessageType")?;
    let contact_idx = column_index(&headers, "Contact")?;
    let text_idx = column_index(&headers, "Text")?;
    let reference_idx = column_index(&headers, "USC_Date")?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let fields = result?;
        records.push(MessageRecord {
            date: parse_date(cell(&fields, date_idx), "Date", row)?,
            time: parse_time(cell(&fields, time_idx), "Time", row)?,
            message_type: MessageType::from_str(cell(&fields, type_idx))?,
            contact: cell(&fields, contact_idx).to_string(),
            text: cell(&fields, text_idx).to_string(),
            reference_date: parse_date(cell(&fields, reference_idx), "USC_Date", row)?,
        });
    }

    info!(records = records.len(), path = %path.display(), "Loaded record table");
    Ok(records)
}

/// Read a raw device export, normalizing columns and injecting the
/// operator-supplied reference date. Export columns the pipeline has no use
/// for are dropped.
pub fn read_device_export(
    path: &Path,
    device: DeviceKind,
    reference_date: NaiveDate,
) -> Result<Vec<MessageRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let records = match device {
        DeviceKind::Iphone => read_iphone_rows(&mut reader, &headers, reference_date)?,
        DeviceKind::Android => read_android_rows(&mut reader, &headers, reference_date)?,
        DeviceKind::Generic => read_generic_rows(&mut reader, &headers, reference_date)?,
    };

    info!(
        records = records.len(),
        device = ?device,
        path = %path.display(),
        "Normalized device export"
    );
    Ok(records)
}

fn read_iphone_rows(
    reader: &mut csv::Reader<std::fs::File>,
    headers: &StringRecord,
    reference_date: NaiveDate,
) -> Result<Vec<MessageRecord>> {
    let contact_idx = column_index(headers, "Chat Session")?;
    let type_idx = column_index(headers, "Type")?;
    let datetime_idx = column_index(headers, "Message Date")?;
    let text_idx = column_index(headers, "Text")?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let fields = result?;

        let message_type = match cell(&fields, type_idx).trim() {
            "Incoming" => MessageType::Received,
            "Outgoing" => MessageType::Sent,
            other => {
                return Err(TxtStudyError::Other(format!(
                    "Unknown iPhone message type {other:?} in row {row}"
                )))
            }
        };
        let timestamp = parse_datetime(
            cell(&fields, datetime_idx),
            &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"],
            "Message Date",
            row,
        )?;

        records.push(MessageRecord {
            date: timestamp.date(),
            time: timestamp.time(),
            message_type,
            contact: cell(&fields, contact_idx).to_string(),
            text: cell(&fields, text_idx).to_string(),
            reference_date,
        });
    }

    Ok(records)
}

fn read_android_rows(
    reader: &mut csv::Reader<std::fs::File>,
    headers: &StringRecord,
    reference_date: NaiveDate,
) -> Result<Vec<MessageRecord>> {
    let contact_idx = column_index(headers, "contact_name")?;
    let type_idx = column_index(headers, "type2")?;
    let datetime_idx = column_index(headers, "readable_date")?;
    let text_idx = column_index(headers, "body")?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let fields = result?;

        let message_type = match cell(&fields, type_idx).trim() {
            "1" => MessageType::Received,
            "2" => MessageType::Sent,
            other => {
                return Err(TxtStudyError::Other(format!(
                    "Unknown Android message type code {other:?} in row {row}"
                )))
            }
        };
        let timestamp = parse_datetime(
            cell(&fields, datetime_idx),
            &["%b %d, %Y %I:%M:%S %p"],
            "readable_date",
            row,
        )?;

        records.push(MessageRecord {
            date: timestamp.date(),
            time: timestamp.time(),
            message_type,
            contact: cell(&fields, contact_idx).to_string(),
            text: cell(&fields, text_idx).to_string(),
            reference_date,
        });
    }

    Ok(records)
}

fn read_generic_rows(
    reader: &mut csv::Reader<std::fs::File>,
    headers: &StringRecord,
    reference_date: NaiveDate,
) -> Result<Vec<MessageRecord>> {
    let date_idx = column_index(headers, "Date")?;
    let time_idx = column_index(headers, "Time")?;
    let type_idx = column_index(headers, "MessageType")?;
    let contact_idx = column_index(headers, "Contact")?;
    let text_idx = column_index(headers, "Text")?;

    let mut records = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let fields = result?;
        records.push(MessageRecord {
            date: parse_date(cell(&fields, date_idx), "Date", row)?,
            time: parse_time(cell(&fields, time_idx), "Time", row)?,
            message_type: MessageType::from_str(cell(&fields, type_idx))?,
            contact: cell(&fields, contact_idx).to_string(),
            text: cell(&fields, text_idx).to_string(),
            reference_date,
        });
    }

    Ok(records)
}

/// Blank out the text of every received message.
pub fn clear_received_text(records: &mut [MessageRecord]) {
    for record in records.iter_mut() {
        if record.message_type == MessageType::Received {
            record.text.clear();
        }
    }
}

/// Drop whole conversations by contact name before anonymization.
#[must_use]
pub fn exclude_contacts(records: Vec<MessageRecord>, names: &[String]) -> Vec<MessageRecord> {
    if names.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| !names.iter().any(|n| n == &r.contact))
        .collect()
}

/// Keep only records inside the retention window (event window plus the
/// trailing months before the run date).
#[must_use]
pub fn retain_window(
    records: Vec<MessageRecord>,
    reference: NaiveDate,
    today: NaiveDate,
    months_around: u32,
    past_months: u32,
) -> Vec<MessageRecord> {
    records
        .into_iter()
        .filter(|r| within_retention(r.date, reference, today, months_around, past_months))
        .collect()
}

/// Distinct contact cells in first-seen order, as exported.
#[must_use]
pub fn unique_contacts(records: &[MessageRecord]) -> Vec<String> {
    let mut contacts: Vec<String> = Vec::new();
    for record in records {
        if !contacts.iter().any(|c| c == &record.contact) {
            contacts.push(record.contact.clone());
        }
    }
    contacts
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| TxtStudyError::MissingColumn(name.to_string()))
}

fn cell<'a>(fields: &'a StringRecord, index: usize) -> &'a str {
    fields.get(index).unwrap_or("")
}

fn parse_date(value: &str, column: &str, row: usize) -> Result<NaiveDate> {
    let trimmed = value.trim();
    for format in ["%Y-%m-%d", "%m/%d/%Y", "%m/%d/%y"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }
    Err(TxtStudyError::InvalidDate(format!(
        "{column} {trimmed:?} in row {row}"
    )))
}

fn parse_time(value: &str, column: &str, row: usize) -> Result<NaiveTime> {
    let trimmed = value.trim();
    for format in ["%H:%M:%S", "%H:%M", "%I:%M:%S %p"] {
        if let Ok(time) = NaiveTime::parse_from_str(trimmed, format) {
            return Ok(time);
        }
    }
    Err(TxtStudyError::InvalidDate(format!(
        "{column} {trimmed:?} in row {row}"
    )))
}

fn parse_datetime(
    value: &str,
    formats: &[&str],
    column: &str,
    row: usize,
) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    for format in formats {
        if let Ok(timestamp) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(timestamp);
        }
    }
    Err(TxtStudyError::InvalidDate(format!(
        "{column} {trimmed:?} in row {row}"
    )))
}
