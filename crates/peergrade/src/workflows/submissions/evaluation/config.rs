/// Tunable thresholds for the heuristic score engine.
///
/// Defaults mirror the rubric the platform shipped with; services can override
/// individual knobs without touching the scoring rules themselves.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Content longer than this many bytes earns the substance bonus.
    pub length_bonus_bytes: usize,
    /// More than this many comment markers earns the documentation bonus.
    pub comment_marker_minimum: usize,
    /// More than this many blank-line breaks earns the structure bonus.
    pub spacing_minimum: usize,
    /// More than this many lines earns the organization bonus.
    pub line_minimum: usize,
    /// Word count at which the completeness word component saturates.
    pub target_words: usize,
    /// Non-blank line count at which the completeness line component saturates.
    pub target_lines: usize,
    /// Similarity above this value flags the submission for plagiarism review.
    pub plagiarism_threshold: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            length_bonus_bytes: 200,
            comment_marker_minimum: 3,
            spacing_minimum: 5,
            line_minimum: 10,
            target_words: 300,
            target_lines: 30,
            plagiarism_threshold: 0.7,
        }
    }
}
