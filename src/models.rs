//! Data models for message records and bucket statistics
//!
//! This module contains all data structures used throughout the application,
//! including message records, detected entities, and aggregate rows.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TxtStudyError;

/// Direction of a message relative to the participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Message sent by the participant
    Sent,
    /// Message received by the participant
    Received,
}

impl FromStr for MessageType {
    type Err = TxtStudyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sent" => Ok(Self::Sent),
            "received" => Ok(Self::Received),
            other => Err(TxtStudyError::Other(format!(
                "Unknown message type: {other}"
            ))),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent => write!(f, "sent"),
            Self::Received => write!(f, "received"),
        }
    }
}

/// A single row of the canonical message table.
///
/// Immutable once ingested, except for the anonymization passes which
/// substitute tokens into the `contact` and `text` fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Calendar date the message was sent or received
    pub date: NaiveDate,
    /// Time of day the message was sent or received
    pub time: NaiveTime,
    /// Whether the message was sent or received
    pub message_type: MessageType,
    /// Contact display name for the conversation
    pub contact: String,
    /// Message text content (empty for received messages)
    pub text: String,
    /// Reference date the time buckets are anchored on (constant across rows)
    pub reference_date: NaiveDate,
}

/// A detected span of personal information in free text.
///
/// Offsets are byte offsets into the analyzed text and must lie on
/// character boundaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedEntity {
    /// The entity text as it appears in the cell
    pub text: String,
    /// Type of entity (PERSON, PHONE_NUMBER, EMAIL_ADDRESS, etc.)
    pub entity_type: String,
    /// Byte offset where the entity starts
    pub start: usize,
    /// Byte offset where the entity ends
    pub end: usize,
}

/// Per-bucket statistics produced by the aggregator.
///
/// One per boundary interval; never mutated after the pipeline completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketAggregate {
    /// Start boundary of the bucket
    pub bucket_start: NaiveDate,
    /// Month offset of the bucket relative to the reference date
    pub month_offset: i32,
    /// Space-joined text of all sent messages in the bucket
    pub messages: String,
    /// Count of sent messages in the bucket
    pub sent: usize,
    /// Count of received messages in the bucket
    pub received: usize,
    /// Contiguous-run conversation count for the bucket
    pub unique_conversations: usize,
}

/// One output row of the analysis table, keyed by participant.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRow {
    /// Participant identifier
    #[serde(rename = "PID")]
    pub pid: String,
    /// Month offset relative to the reference date
    #[serde(rename = "Month")]
    pub month: i32,
    /// Space-joined sent-message text
    #[serde(rename = "Messages")]
    pub messages: String,
    /// Sent-message count
    #[serde(rename = "Sent")]
    pub sent: usize,
    /// Received-message count
    #[serde(rename = "Received")]
    pub received: usize,
    /// Contiguous-run conversation count
    #[serde(rename = "Unique Conversations")]
    pub unique_conversations: usize,
}

impl BucketAggregate {
    /// Attach a participant identifier, producing an output row
    #[must_use]
    pub fn into_row(self, pid: &str) -> AnalysisRow {
        AnalysisRow {
            pid: pid.to_string(),
            month: self.month_offset,
            messages: self.messages,
            sent: self.sent,
            received: self.received,
            unique_conversations: self.unique_conversations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_parse() {
        assert_eq!("sent".parse::<MessageType>().unwrap(), MessageType::Sent);
        assert_eq!(
            " Received ".parse::<MessageType>().unwrap(),
            MessageType::Received
        );
        assert!("draft".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_message_type_display_round_trip() {
        assert_eq!(MessageType::Sent.to_string(), "sent");
        assert_eq!(MessageType::Received.to_string(), "received");
    }
}
