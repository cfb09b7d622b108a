//! Txt Study - Message De-identification and Time-Bucket Analysis
//!
//! A Rust library for preparing anonymized text-message datasets for
//! research around a reference event date.
//!
//! # Features
//!
//! - Normalize iPhone and Android text exports to one record schema
//! - Two-pass de-identification (contact tokens + entity counters)
//! - Month-aligned time buckets relative to a reference date
//! - Per-bucket statistics (text, counts, conversation runs)
//! - CSV artifacts plus contact/word review side-files

/// Statistic accumulation per time bucket
pub mod aggregate;
/// Contact-token and entity-counter anonymization passes
pub mod anonymize;
/// Configuration management
pub mod config;
/// Error types
pub mod error;
/// CSV artifact writers
pub mod file_writer;
/// CSV ingestion and device normalization
pub mod ingest;
/// Logging setup and utilities
pub mod logging;
/// Data models and structures
pub mod models;
/// Entity-detection collaborator interface
pub mod nlp;
/// Analysis pipeline driver
pub mod pipeline;
/// Post-anonymization review artifacts
pub mod review;
/// Input validation and sanitization
pub mod validation;
/// Date window and bucket-boundary computation
pub mod window;

// Re-export key components for easier access
pub use anonymize::{ContactTokenMap, EntityMapping, Pseudonymizer};
pub use models::{AnalysisRow, BucketAggregate, MessageRecord, MessageType};
pub use nlp::{EntityDetector, RuleBasedDetector};
pub use pipeline::AnalysisPipeline;
pub use window::BucketWindows;
