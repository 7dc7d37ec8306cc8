//! Structured extraction from prescription text.
//!
//! Image preprocessing and OCR happen outside this crate; these helpers
//! work on the recognized text only.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Maximum number of medications kept from a `Tab/Cap/Syp` listing.
const MAX_LISTED_MEDICATIONS: usize = 3;

struct Patterns {
    listed_medication: Regex,
    dosage: Regex,
    frequency: Regex,
    duration: Regex,
    dosed_name: Regex,
    prefixed_name: Regex,
    whitespace: Regex,
    disallowed: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| Patterns {
        listed_medication: Regex::new(r"(?i)(?:Tab|Cap|Syp)\s+([A-Za-z]+(?:\s+[A-Za-z]+)?)")
            .expect("static pattern"),
        dosage: Regex::new(r"(?i)(\d+)\s*(mg|ml|tablets?)").expect("static pattern"),
        frequency: Regex::new(r"(?i)(\d+)\s*(?:times?|x)\s*(?:daily|per day|a day)")
            .expect("static pattern"),
        duration: Regex::new(r"(?i)(?:for\s+)?(\d+)\s*(days?|weeks?|months?)")
            .expect("static pattern"),
        dosed_name: Regex::new(
            r"(?i)([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)\s+\d+\s*(?:mg|ml|tablet|capsule|tab)",
        )
        .expect("static pattern"),
        prefixed_name: Regex::new(r"(?i)(?:Rx|Medicine|Drug)[\s:]+([A-Za-z\s]+?)(?:\d+|$|\n)")
            .expect("static pattern"),
        whitespace: Regex::new(r"\s+").expect("static pattern"),
        disallowed: Regex::new(r"[^\w\s.,:\-()]").expect("static pattern"),
    })
}

/// Fields recovered from a prescription.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionData {
    pub medications: Vec<String>,
    pub medication_count: usize,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub dosage_frequency: Option<u32>,
    pub duration: Option<String>,
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescriptionValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
}

/// Everything recovered from one recognized prescription text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPrescription {
    pub cleaned_text: String,
    /// Names found next to a dosage or an `Rx:` prefix in the cleaned text
    pub medicines: Vec<String>,
    pub suggestions: Vec<String>,
    pub prescription: PrescriptionData,
    pub validation: PrescriptionValidation,
}

/// Run the whole pipeline on raw OCR output.
///
/// Structured fields are parsed from the raw text; medicine names and
/// OCR hints come from the cleaned text.
#[must_use]
pub fn process(raw: &str) -> ProcessedPrescription {
    let cleaned_text = clean_text(raw);
    let prescription = parse(raw);
    let validation = validate(&prescription);

    ProcessedPrescription {
        medicines: extract_medicines(&cleaned_text),
        suggestions: ocr_suggestions(&cleaned_text),
        cleaned_text,
        prescription,
        validation,
    }
}

/// Parse medication names, dosage, frequency and duration from text.
#[must_use]
pub fn parse(text: &str) -> PrescriptionData {
    let p = patterns();
    let mut data = PrescriptionData::default();

    let listed: Vec<String> = p
        .listed_medication
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .collect();
    if !listed.is_empty() {
        data.medication_count = listed.len();
        data.medications = listed.into_iter().take(MAX_LISTED_MEDICATIONS).collect();
    }

    if let Some(c) = p.dosage.captures(text) {
        data.dosage = Some(format!("{} {}", &c[1], c[2].to_lowercase()));
    }

    if let Some(c) = p.frequency.captures(text) {
        let times = &c[1];
        data.frequency = Some(format!("{times}x daily"));
        data.dosage_frequency = times.parse().ok();
    }

    if let Some(c) = p.duration.captures(text) {
        data.duration = Some(format!("{} {}", &c[1], c[2].to_lowercase()));
    }

    data
}

/// Check that the essentials were recovered.
#[must_use]
pub fn validate(data: &PrescriptionData) -> PrescriptionValidation {
    let mut issues = Vec::new();
    if data.medications.is_empty() {
        issues.push("No medications detected".to_string());
    }
    if data.dosage.is_none() {
        issues.push("Dosage information missing".to_string());
    }
    if data.frequency.is_none() {
        issues.push("Frequency information missing".to_string());
    }
    PrescriptionValidation {
        is_valid: issues.is_empty(),
        issues,
    }
}

fn capitalize(sentence: &str) -> String {
    let mut chars = sentence.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest = chars.as_str().to_lowercase();
    first.to_uppercase().chain(rest.chars()).collect()
}

/// Normalize raw OCR output: collapse whitespace, drop stray symbols and
/// capitalize each sentence.
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let p = patterns();
    let collapsed = p.whitespace.replace_all(raw, " ");
    let filtered = p.disallowed.replace_all(&collapsed, "");

    filtered
        .split('.')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(". ")
}

/// Medicine names that appear next to a dosage or after an `Rx:` style
/// prefix. First occurrence order, duplicates and very short names removed.
#[must_use]
pub fn extract_medicines(text: &str) -> Vec<String> {
    let p = patterns();
    let candidates = p
        .dosed_name
        .captures_iter(text)
        .map(|c| c[1].trim().to_string())
        .chain(
            p.prefixed_name
                .captures_iter(text)
                .map(|c| c[1].trim().to_string()),
        );

    let mut seen = Vec::new();
    for name in candidates {
        if name.chars().count() > 2 && !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// Hints for digits OCR commonly confuses with letters.
#[must_use]
pub fn ocr_suggestions(text: &str) -> Vec<String> {
    const CONFUSIONS: [(char, &str); 4] = [('0', "O"), ('1', "I or l"), ('5', "S"), ('8', "B")];

    CONFUSIONS
        .iter()
        .filter(|(digit, _)| text.contains(*digit))
        .map(|(digit, letter)| format!("Check if '{digit}' should be '{letter}'"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Dr. Smith\nTab Metformin 500 mg\nCap Omeprazole 20mg\n\
                          Take 2 times daily for 30 days";

    #[test]
    fn test_parse_prescription() {
        let data = parse(SAMPLE);
        assert_eq!(data.medications, vec!["Metformin", "Omeprazole"]);
        assert_eq!(data.medication_count, 2);
        assert_eq!(data.dosage.as_deref(), Some("500 mg"));
        assert_eq!(data.frequency.as_deref(), Some("2x daily"));
        assert_eq!(data.dosage_frequency, Some(2));
        assert_eq!(data.duration.as_deref(), Some("30 days"));
        assert!(validate(&data).is_valid);
    }

    #[test]
    fn test_listed_medications_are_capped() {
        let data = parse("Tab Aaa, Tab Bee, Tab Cee, Tab Dee");
        assert_eq!(data.medication_count, 4);
        assert_eq!(data.medications.len(), MAX_LISTED_MEDICATIONS);
    }

    #[test]
    fn test_validation_issues() {
        let result = validate(&parse("illegible"));
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 3);
    }

    #[test]
    fn test_clean_text() {
        let cleaned = clean_text("  take   ONE tablet*** daily.  with food!. ");
        assert_eq!(cleaned, "Take one tablet daily. With food");
    }

    #[test]
    fn test_extract_medicines() {
        let meds = extract_medicines("Amoxicillin 250 mg three times. Rx: Ibuprofen\n");
        assert_eq!(meds, vec!["Amoxicillin", "Ibuprofen"]);
    }

    #[test]
    fn test_process_pipeline() {
        let result = process("Rx:  Amoxicillin 250 mg.\ntake 3 times daily for 5 days");

        assert_eq!(
            result.cleaned_text,
            "Rx: amoxicillin 250 mg. Take 3 times daily for 5 days"
        );
        assert_eq!(result.medicines, vec!["amoxicillin"]);
        assert_eq!(
            result.suggestions,
            vec![
                "Check if '0' should be 'O'".to_string(),
                "Check if '5' should be 'S'".to_string(),
            ]
        );
        assert_eq!(result.prescription.dosage.as_deref(), Some("250 mg"));
        assert_eq!(result.prescription.frequency.as_deref(), Some("3x daily"));
        assert_eq!(result.prescription.duration.as_deref(), Some("5 days"));
        assert!(!result.validation.is_valid);
        assert_eq!(result.validation.issues, vec!["No medications detected"]);
    }

    #[test]
    fn test_ocr_suggestions() {
        let hints = ocr_suggestions("Dose 10 mg");
        assert_eq!(
            hints,
            vec![
                "Check if '0' should be 'O'".to_string(),
                "Check if '1' should be 'I or l'".to_string(),
            ]
        );
    }
}
