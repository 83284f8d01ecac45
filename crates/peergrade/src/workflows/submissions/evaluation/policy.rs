use serde::{Deserialize, Serialize};

/// Phrase pairs that, appearing in order, suggest the author described copying
/// the work from elsewhere.
const SUSPICIOUS_PHRASES: [(&str, &str); 3] =
    [("copy", "paste"), ("from", "website"), ("found", "online")];

const SIMILARITY_SUSPICIOUS: f32 = 0.9;
const SIMILARITY_BASELINE: f32 = 0.6;
const CONFIDENCE_FLAGGED: f32 = 0.95;
const CONFIDENCE_CLEAR: f32 = 0.7;

/// Outcome of the provenance check on a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlagiarismReport {
    pub flagged: bool,
    pub similarity: f32,
    pub confidence: f32,
    pub message: String,
    pub suggestions: Vec<String>,
}

pub(crate) fn check_plagiarism(content: &str, threshold: f32) -> PlagiarismReport {
    let lowered = content.to_lowercase();
    let suspicious = SUSPICIOUS_PHRASES
        .iter()
        .any(|(first, second)| contains_in_order(&lowered, first, second));

    let similarity = if suspicious {
        SIMILARITY_SUSPICIOUS
    } else {
        SIMILARITY_BASELINE
    };
    let flagged = similarity > threshold;

    if flagged {
        PlagiarismReport {
            flagged,
            similarity,
            confidence: CONFIDENCE_FLAGGED,
            message: "This submission contains phrasing commonly associated with copied work."
                .to_string(),
            suggestions: vec![
                "Rewrite the flagged passages in your own words.".to_string(),
                "Cite any sources you consulted.".to_string(),
            ],
        }
    } else {
        PlagiarismReport {
            flagged,
            similarity,
            confidence: CONFIDENCE_CLEAR,
            message: "No strong plagiarism signals were detected.".to_string(),
            suggestions: Vec::new(),
        }
    }
}

fn contains_in_order(text: &str, first: &str, second: &str) -> bool {
    match text.find(first) {
        Some(pos) => text[pos + first.len()..].contains(second),
        None => false,
    }
}
