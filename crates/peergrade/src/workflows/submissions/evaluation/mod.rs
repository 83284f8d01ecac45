//! Deterministic scoring rubric applied to every submission.
//!
//! The engine is pure: the same content always yields the same scores, every
//! score lands in [0, 1], and no external dependency is consulted. It backs
//! both the persisted score dimensions and the fallback grading path.

mod config;
mod policy;
mod rules;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use config::ScoringConfig;
pub use policy::PlagiarismReport;

/// Score dimension names as persisted alongside feedback artifacts.
pub const DIMENSION_CORRECTNESS: &str = "correctness";
pub const DIMENSION_QUALITY: &str = "quality";
pub const DIMENSION_COMPLETENESS: &str = "completeness";

/// One full pass of the rubric over a piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSet {
    pub correctness: f32,
    pub quality: f32,
    pub completeness: f32,
}

impl ScoreSet {
    pub fn into_map(self) -> BTreeMap<String, f32> {
        let mut map = BTreeMap::new();
        map.insert(DIMENSION_CORRECTNESS.to_string(), self.correctness);
        map.insert(DIMENSION_QUALITY.to_string(), self.quality);
        map.insert(DIMENSION_COMPLETENESS.to_string(), self.completeness);
        map
    }
}

/// Heuristic scorer for submission content.
#[derive(Debug, Clone, Default)]
pub struct ScoreEngine {
    config: ScoringConfig,
}

impl ScoreEngine {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score_correctness(&self, content: &str) -> f32 {
        rules::score_correctness(content, &self.config)
    }

    pub fn score_quality(&self, content: &str) -> f32 {
        rules::score_quality(content, &self.config)
    }

    pub fn score_completeness(&self, content: &str) -> f32 {
        rules::score_completeness(content, &self.config)
    }

    pub fn score(&self, content: &str) -> ScoreSet {
        ScoreSet {
            correctness: self.score_correctness(content),
            quality: self.score_quality(content),
            completeness: self.score_completeness(content),
        }
    }

    pub fn check_plagiarism(&self, content: &str) -> PlagiarismReport {
        policy::check_plagiarism(content, self.config.plagiarism_threshold)
    }

    pub(crate) fn word_count(content: &str) -> usize {
        rules::word_count(content)
    }

    pub(crate) fn contains_word(text: &str, word: &str) -> bool {
        rules::contains_word(text, word)
    }
}
