use anyhow::Result;
use regex::Regex;
use whatlang::{detect, Lang};

use crate::models::DetectedEntity;

/// Capability interface for personal-entity detection.
///
/// The pipeline never depends on which detector implementation is plugged
/// in; anything that can turn a text cell and a language tag into typed
/// spans will do.
pub trait EntityDetector {
    /// Detect personal-entity spans in `text`.
    fn detect(&self, text: &str, language: &str) -> Result<Vec<DetectedEntity>>;
}

/// Rule-based entity detector.
///
/// Finds phone numbers and email addresses with regular expressions, and
/// candidate person names with a capitalized-word heuristic gated on the
/// text actually reading as English.
pub struct RuleBasedDetector {
    phone_regex: Regex,
    email_regex: Regex,
    name_regex: Regex,
}

/// Capitalized words that open sentences without naming anyone.
const SENTENCE_STARTERS: [&str; 5] = ["The", "A", "An", "This", "That"];

impl RuleBasedDetector {
    /// Create a new rule-based detector.
    pub fn new() -> Result<Self> {
        let phone_regex = Regex::new(r"(?:\+?\d{1,3}[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}")
            .map_err(|e| anyhow::anyhow!("Failed to compile phone regex: {e}"))?;
        let email_regex = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
            .map_err(|e| anyhow::anyhow!("Failed to compile email regex: {e}"))?;
        let name_regex = Regex::new(r"\b[A-Z][a-z]+\b")
            .map_err(|e| anyhow::anyhow!("Failed to compile name regex: {e}"))?;

        Ok(Self {
            phone_regex,
            email_regex,
            name_regex,
        })
    }

    fn find_spans(&self, regex: &Regex, text: &str, entity_type: &str) -> Vec<DetectedEntity> {
        regex
            .find_iter(text)
            .map(|m| DetectedEntity {
                text: m.as_str().to_string(),
                entity_type: entity_type.to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    /// Capitalized-word name candidates, skipping a sentence starter in
    /// first position.
    fn find_name_spans(&self, text: &str) -> Vec<DetectedEntity> {
        let first_word_start = text
            .char_indices()
            .find(|(_, c)| !c.is_whitespace())
            .map_or(0, |(i, _)| i);

        self.name_regex
            .find_iter(text)
            .filter(|m| !(m.start() == first_word_start && SENTENCE_STARTERS.contains(&m.as_str())))
            .map(|m| DetectedEntity {
                text: m.as_str().to_string(),
                entity_type: "PERSON".to_string(),
                start: m.start(),
                end: m.end(),
            })
            .collect()
    }

    fn reads_as_english(text: &str) -> bool {
        detect(text).is_some_and(|info| info.lang() == Lang::Eng && info.confidence() > 0.5)
    }
}

impl EntityDetector for RuleBasedDetector {
    fn detect(&self, text: &str, language: &str) -> Result<Vec<DetectedEntity>> {
        let mut entities = self.find_spans(&self.email_regex, text, "EMAIL_ADDRESS");
        entities.extend(self.find_spans(&self.phone_regex, text, "PHONE_NUMBER"));

        // The name heuristic only makes sense for English text.
        if language == "en" && Self::reads_as_english(text) {
            entities.extend(self.find_name_spans(text));
        }

        // Earliest span first; on ties the longer span wins downstream.
        entities.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));
        Ok(entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_phone_number() {
        let detector = RuleBasedDetector::new().expect("Failed to create detector");
        let entities = detector.detect("call me at +1 (555) 123-4567 ok", "en").unwrap();

        let phone = entities
            .iter()
            .find(|e| e.entity_type == "PHONE_NUMBER")
            .expect("phone not detected");
        assert!(phone.text.contains("555"));
    }

    #[test]
    fn test_detect_email_address() {
        let detector = RuleBasedDetector::new().expect("Failed to create detector");
        let entities = detector.detect("write to jess@example.com please", "en").unwrap();

        let email = entities
            .iter()
            .find(|e| e.entity_type == "EMAIL_ADDRESS")
            .expect("email not detected");
        assert_eq!(email.text, "jess@example.com");
        assert_eq!(&"write to jess@example.com please"[email.start..email.end], email.text);
    }

    #[test]
    fn test_detect_person_name() {
        let detector = RuleBasedDetector::new().expect("Failed to create detector");
        let text = "I was talking with Robert about the weekend plans and he said we should leave early in the morning";
        let entities = detector.detect(text, "en").unwrap();

        assert!(entities
            .iter()
            .any(|e| e.entity_type == "PERSON" && e.text == "Robert"));
    }

    #[test]
    fn test_sentence_starter_not_a_name() {
        let detector = RuleBasedDetector::new().expect("Failed to create detector");
        let text = "The weather is really nice around here this time of year";
        let entities = detector.detect(text, "en").unwrap();

        assert!(!entities.iter().any(|e| e.text == "The"));
    }

    #[test]
    fn test_non_english_language_skips_names() {
        let detector = RuleBasedDetector::new().expect("Failed to create detector");
        let text = "I was talking with Robert about the weekend plans yesterday";
        let entities = detector.detect(text, "de").unwrap();

        assert!(!entities.iter().any(|e| e.entity_type == "PERSON"));
    }
}
