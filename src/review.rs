//! Review artifacts generated after anonymization.
//!
//! Research staff check two lists before a dataset leaves the machine: the
//! contact-name residue still visible after both passes, and every distinct
//! word appearing in anonymized sent text.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::anonymize::ContactTokenMap;
use crate::error::{Result, TxtStudyError};
use crate::models::{MessageRecord, MessageType};

/// Deduplicated candidate names observed in the record set after
/// anonymization.
///
/// Uses the same collection rule as the contact pass, so anything this
/// returns survived both passes and needs a human look.
pub fn contacts_to_check(records: &[MessageRecord]) -> Result<Vec<String>> {
    ContactTokenMap::candidate_names(records)
}

/// Deduplicated word list from anonymized sent-message text.
///
/// Lowercased, NFC-normalized, punctuation stripped, first-seen order.
pub fn words_to_review(records: &[MessageRecord]) -> Result<Vec<String>> {
    let punctuation_regex = Regex::new(r"[^\w\s]")
        .map_err(|e| TxtStudyError::Other(format!("Failed to compile punctuation regex: {e}")))?;

    let mut words: Vec<String> = Vec::new();
    for record in records {
        if record.message_type != MessageType::Sent {
            continue;
        }

        let normalized: String = record.text.nfc().collect::<String>().to_lowercase();
        for raw in normalized.split_whitespace() {
            let word = punctuation_regex.replace_all(raw, "").into_owned();
            if !word.is_empty() && !words.iter().any(|w| w == &word) {
                words.push(word);
            }
        }
    }

    Ok(words)
}
