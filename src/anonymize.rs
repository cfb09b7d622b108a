//! Two-stage identity replacement.
//!
//! The contact-name pass swaps every known contact name for a random
//! per-run token; the entity-counter pass swaps any remaining detected
//! personal entities for per-type sequential tokens. Both passes must
//! complete before an anonymized table may be exported.

use rand::Rng;
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::error::{Result, TxtStudyError};
use crate::models::{DetectedEntity, MessageRecord};
use crate::nlp::EntityDetector;

const TOKEN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Map from original contact name to a per-run random token.
///
/// Tokens are random across runs but stable within one: the same name maps
/// to the same token everywhere it appears, in the contact column and in
/// message text alike.
#[derive(Debug)]
pub struct ContactTokenMap {
    tokens: HashMap<String, String>,
    pattern: Option<Regex>,
}

impl ContactTokenMap {
    /// Collect the distinct candidate-name set from a record set.
    ///
    /// Strips `<...>` annotation substrings from each contact cell, splits
    /// multi-party `A & B` contacts into individual names, trims whitespace,
    /// drops empties, and deduplicates in first-seen order.
    pub fn candidate_names(records: &[MessageRecord]) -> Result<Vec<String>> {
        let annotation_regex = Regex::new(r"<[^>]*>")
            .map_err(|e| TxtStudyError::Other(format!("Failed to compile annotation regex: {e}")))?;

        let mut names = Vec::new();
        for record in records {
            let stripped = annotation_regex.replace_all(&record.contact, "");
            for part in stripped.split('&') {
                let name = part.trim();
                if !name.is_empty() && !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }

        Ok(names)
    }

    /// Build the token map for a record set, one random token per distinct
    /// name.
    pub fn generate<R: Rng>(
        records: &[MessageRecord],
        token_length: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let names = Self::candidate_names(records)?;

        let mut tokens = HashMap::with_capacity(names.len());
        for name in &names {
            tokens.insert(name.clone(), random_token(rng, token_length));
        }

        // Whole-word alternation over all known names, longest first so a
        // multi-word name is never clipped by one of its own words.
        let pattern = if names.is_empty() {
            None
        } else {
            let mut sorted = names;
            sorted.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
            let alternation = sorted
                .iter()
                .map(|n| regex::escape(n))
                .collect::<Vec<_>>()
                .join("|");
            Some(
                Regex::new(&format!(r"\b(?:{alternation})\b")).map_err(|e| {
                    TxtStudyError::Other(format!("Failed to compile name pattern: {e}"))
                })?,
            )
        };

        debug!(names = tokens.len(), "Built contact token map");
        Ok(Self { tokens, pattern })
    }

    /// Token assigned to `name`, if it is a known contact.
    #[must_use]
    pub fn token_for(&self, name: &str) -> Option<&str> {
        self.tokens.get(name).map(String::as_str)
    }

    /// Number of distinct names in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when no names were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Replace every whole-word occurrence of a known name in `text`.
    /// Unmatched substrings are left untouched.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        match &self.pattern {
            Some(pattern) => pattern
                .replace_all(text, |caps: &regex::Captures<'_>| {
                    self.tokens
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned(),
            None => text.to_string(),
        }
    }

    /// Apply the map to the contact and text fields of every record.
    pub fn apply_records(&self, records: &mut [MessageRecord]) {
        for record in records.iter_mut() {
            record.contact = self.apply(&record.contact);
            record.text = self.apply(&record.text);
        }
    }
}

fn random_token<R: Rng>(rng: &mut R, length: usize) -> String {
    let body: String = (0..length)
        .map(|_| TOKEN_CHARS[rng.gen_range(0..TOKEN_CHARS.len())] as char)
        .collect();
    format!("<{body}>")
}

/// Typed two-level mapping: entity type -> (original text -> token).
///
/// Within a type, tokens carry a strictly increasing index assigned in
/// first-seen order; a given original text maps to the same token once
/// assigned, regardless of which column it was found in.
#[derive(Debug, Default)]
pub struct EntityMapping {
    types: BTreeMap<String, TypeMapping>,
}

#[derive(Debug, Default)]
struct TypeMapping {
    tokens: HashMap<String, String>,
    next_index: usize,
}

impl EntityMapping {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for `text` under `entity_type`, assigning the next index on
    /// first sight.
    pub fn token_for(&mut self, entity_type: &str, text: &str) -> String {
        let entry = self.types.entry(entity_type.to_string()).or_default();
        if let Some(token) = entry.tokens.get(text) {
            return token.clone();
        }

        let token = format!("<{entity_type}_{}>", entry.next_index);
        entry.next_index += 1;
        entry.tokens.insert(text.to_string(), token.clone());
        token
    }

    /// Previously assigned token for `text` under `entity_type`, if any.
    #[must_use]
    pub fn assigned(&self, entity_type: &str, text: &str) -> Option<&str> {
        self.types
            .get(entity_type)
            .and_then(|t| t.tokens.get(text))
            .map(String::as_str)
    }

    /// Distinct originals recorded per entity type.
    #[must_use]
    pub fn type_counts(&self) -> Vec<(&str, usize)> {
        self.types
            .iter()
            .map(|(ty, entry)| (ty.as_str(), entry.tokens.len()))
            .collect()
    }

    /// Total number of distinct originals across all types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.values().map(|t| t.tokens.len()).sum()
    }

    /// True when nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Entity-counter anonymization pass.
///
/// Owns the [`EntityMapping`] for one run and drives the external detection
/// collaborator over every free-text cell.
pub struct Pseudonymizer<'a, D: EntityDetector> {
    detector: &'a D,
    language: String,
    mapping: EntityMapping,
}

impl<'a, D: EntityDetector> Pseudonymizer<'a, D> {
    /// Create a pass bound to a detector and a language tag.
    pub fn new(detector: &'a D, language: &str) -> Self {
        Self {
            detector,
            language: language.to_string(),
            mapping: EntityMapping::new(),
        }
    }

    /// Anonymize one text cell. Empty cells pass through unchanged;
    /// detection failures abort the run.
    pub fn anonymize_cell(&mut self, text: &str) -> Result<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        let spans = self
            .detector
            .detect(text, &self.language)
            .map_err(|e| TxtStudyError::Detection(e.to_string()))?;
        let spans = validate_spans(text, spans)?;

        // Indices are assigned in reading order; the substitution itself
        // runs back-to-front so earlier byte offsets stay valid.
        let tokens: Vec<String> = spans
            .iter()
            .map(|span| self.mapping.token_for(&span.entity_type, &span.text))
            .collect();

        let mut out = text.to_string();
        for (span, token) in spans.iter().zip(&tokens).rev() {
            out.replace_range(span.start..span.end, token);
        }

        Ok(out)
    }

    /// Run the pass over the contact and text fields of every record.
    ///
    /// Columns named in `excluded_columns` are skipped; the typed date and
    /// message-type columns never carry free text and are not processed.
    pub fn anonymize_records(
        &mut self,
        records: &mut [MessageRecord],
        excluded_columns: &[String],
    ) -> Result<()> {
        let process_contact = !excluded_columns.iter().any(|c| c == "Contact");
        let process_text = !excluded_columns.iter().any(|c| c == "Text");

        for record in records.iter_mut() {
            if process_contact {
                record.contact = self.anonymize_cell(&record.contact)?;
            }
            if process_text {
                record.text = self.anonymize_cell(&record.text)?;
            }
        }

        Ok(())
    }

    /// The mapping accumulated so far.
    #[must_use]
    pub fn mapping(&self) -> &EntityMapping {
        &self.mapping
    }

    /// Consume the pass and return its mapping.
    #[must_use]
    pub fn into_mapping(self) -> EntityMapping {
        self.mapping
    }
}

/// Enforce the detector contract, then drop overlapping spans.
///
/// A violated contract is a programming defect in the collaborator, not an
/// input problem, and aborts the run.
fn validate_spans(text: &str, mut spans: Vec<DetectedEntity>) -> Result<Vec<DetectedEntity>> {
    for span in &spans {
        if span.entity_type.trim().is_empty() {
            return Err(TxtStudyError::InvalidConfig(
                "Detector returned a span with an empty entity type".to_string(),
            ));
        }
        if span.start > span.end
            || span.end > text.len()
            || !text.is_char_boundary(span.start)
            || !text.is_char_boundary(span.end)
        {
            return Err(TxtStudyError::InvalidConfig(format!(
                "Detector returned invalid span bounds {}..{} for a {}-byte cell",
                span.start,
                span.end,
                text.len()
            )));
        }
        if text[span.start..span.end] != span.text {
            return Err(TxtStudyError::InvalidConfig(format!(
                "Detector span text {:?} does not match the cell at {}..{}",
                span.text, span.start, span.end
            )));
        }
    }

    spans.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut kept: Vec<DetectedEntity> = Vec::with_capacity(spans.len());
    for span in spans {
        match kept.last() {
            Some(prev) if span.start < prev.end => {} // overlapped, first span wins
            _ => kept.push(span),
        }
    }

    Ok(kept)
}
