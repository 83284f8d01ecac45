use super::config::ScoringConfig;

const CORRECTNESS_BASE: f32 = 0.3;
const QUALITY_BASE: f32 = 0.3;

/// Correctness heuristic: structural signals of working code, clamped to [0, 1].
pub(crate) fn score_correctness(content: &str, config: &ScoringConfig) -> f32 {
    let lowered = content.to_lowercase();

    let mut score = CORRECTNESS_BASE;
    if contains_word(&lowered, "def") || contains_word(&lowered, "function") {
        score += 0.25;
    }
    if contains_word(content, "return") {
        score += 0.15;
    }
    if contains_word(&lowered, "import") || contains_word(&lowered, "require") {
        score += 0.10;
    }
    if content.len() > config.length_bonus_bytes {
        score += 0.20;
    }
    score.min(1.0)
}

/// Quality heuristic: comments, spacing, length, and naming convention.
pub(crate) fn score_quality(content: &str, config: &ScoringConfig) -> f32 {
    let mut score = QUALITY_BASE;
    if content.matches('#').count() > config.comment_marker_minimum {
        score += 0.20;
    }
    if blank_line_breaks(content) > config.spacing_minimum {
        score += 0.15;
    }
    if content.lines().count() > config.line_minimum {
        score += 0.20;
    }
    if !has_camel_case(content) {
        score += 0.15;
    }
    score.min(1.0)
}

/// Completeness heuristic: weighted blend of word volume and non-blank lines.
pub(crate) fn score_completeness(content: &str, config: &ScoringConfig) -> f32 {
    let words = word_count(content);
    let lines = content.lines().filter(|line| !line.trim().is_empty()).count();

    let word_score = (words as f32 / config.target_words as f32).min(1.0);
    let line_score = (lines as f32 / config.target_lines as f32).min(1.0);
    (word_score * 0.6 + line_score * 0.4).min(1.0)
}

pub(crate) fn word_count(content: &str) -> usize {
    content.split_whitespace().count()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-token occurrence check, so `defined` does not count as `def`.
pub(crate) fn contains_word(text: &str, word: &str) -> bool {
    let mut offset = 0;
    while let Some(pos) = text[offset..].find(word) {
        let begin = offset + pos;
        let end = begin + word.len();
        let before = text[..begin].chars().next_back();
        let after = text[end..].chars().next();
        if !before.map_or(false, is_word_char) && !after.map_or(false, is_word_char) {
            return true;
        }
        offset = begin + word.len();
    }
    false
}

/// Counts paragraph breaks: a newline, optional horizontal whitespace, then
/// another newline.
fn blank_line_breaks(content: &str) -> usize {
    let bytes = content.as_bytes();
    let mut count = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\n' {
            let mut j = i + 1;
            while j < bytes.len() && matches!(bytes[j], b' ' | b'\t' | b'\r') {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'\n' {
                count += 1;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    count
}

/// True when an ASCII lowercase letter is immediately followed by an uppercase one.
fn has_camel_case(content: &str) -> bool {
    let mut prev_lower = false;
    for c in content.chars() {
        if c.is_ascii_uppercase() && prev_lower {
            return true;
        }
        prev_lower = c.is_ascii_lowercase();
    }
    false
}
