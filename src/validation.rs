use chrono::NaiveDate;
use std::path::Path;

use crate::error::{Result, TxtStudyError};

/// Validation utilities for operator input.
///
/// These are pure functions returning typed results; the outer driver
/// decides whether to re-prompt or abort. Core pipeline code only ever sees
/// already-validated values.
#[derive(Debug, Copy, Clone)]
pub struct InputValidator;

impl InputValidator {
    /// Validate and normalize a participant record ID.
    ///
    /// Accepts up to `max_length` digits and zero-pads to the full length,
    /// so `7` becomes `0007`.
    pub fn validate_record_id(record_id: &str, max_length: usize) -> Result<String> {
        let trimmed = record_id.trim();

        if trimmed.is_empty() {
            return Err(TxtStudyError::InvalidRecordId(
                "Record ID cannot be empty".to_string(),
            ));
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(TxtStudyError::InvalidRecordId(format!(
                "{trimmed:?} is not an integer"
            )));
        }
        if trimmed.len() > max_length {
            return Err(TxtStudyError::InvalidRecordId(format!(
                "{trimmed:?} has more than {max_length} digits"
            )));
        }

        Ok(format!("{trimmed:0>max_length$}"))
    }

    /// Parse a reference date in `MM/YYYY` form into the first of that
    /// month.
    pub fn parse_reference_date(input: &str) -> Result<NaiveDate> {
        let parts: Vec<&str> = input.trim().split('/').collect();

        let [month_part, year_part] = parts.as_slice() else {
            return Err(TxtStudyError::InvalidDate(format!(
                "{input:?} (expected MM/YYYY, e.g. 07/2024)"
            )));
        };

        let valid_shape = month_part.len() == 2
            && year_part.len() == 4
            && month_part.chars().all(|c| c.is_ascii_digit())
            && year_part.chars().all(|c| c.is_ascii_digit());
        if !valid_shape {
            return Err(TxtStudyError::InvalidDate(format!(
                "{input:?} (expected MM/YYYY, e.g. 07/2024)"
            )));
        }

        let month: u32 = month_part
            .parse()
            .map_err(|_| TxtStudyError::InvalidDate(input.to_string()))?;
        let year: i32 = year_part
            .parse()
            .map_err(|_| TxtStudyError::InvalidDate(input.to_string()))?;

        NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            TxtStudyError::InvalidDate(format!("{input:?} (month must be 01-12)"))
        })
    }

    /// Validate that an input path points at a readable CSV file.
    pub fn validate_input_file(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(TxtStudyError::Other(format!(
                "Input file does not exist: {}",
                path.display()
            )));
        }
        if !path.is_file() {
            return Err(TxtStudyError::Other(format!(
                "Input path is not a file: {}",
                path.display()
            )));
        }

        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(TxtStudyError::Other(format!(
                "Input file is not a .csv file: {}",
                path.display()
            )));
        }

        Ok(())
    }

    /// Validate that an output directory exists.
    pub fn validate_output_dir(path: &Path) -> Result<()> {
        if !path.is_dir() {
            return Err(TxtStudyError::Other(format!(
                "Output directory does not exist: {}",
                path.display()
            )));
        }
        Ok(())
    }

    /// Validate a detector language tag.
    pub fn validate_language_tag(language: &str) -> Result<()> {
        let valid = !language.is_empty()
            && language.len() <= 8
            && language
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-');
        if !valid {
            return Err(TxtStudyError::InvalidConfig(format!(
                "Invalid language tag: {language:?}"
            )));
        }
        Ok(())
    }
}
