use super::prompt::FeedbackRequest;
use crate::workflows::submissions::evaluation::ScoreEngine;

/// Structural signals extracted from the content for rule-based grading.
struct ContentSignals {
    line_count: usize,
    word_count: usize,
    has_functions: bool,
    has_comments: bool,
    has_returns: bool,
    has_imports: bool,
}

impl ContentSignals {
    fn extract(content: &str) -> Self {
        let lowered = content.to_lowercase();
        Self {
            line_count: content.lines().count(),
            word_count: ScoreEngine::word_count(content),
            has_functions: ScoreEngine::contains_word(&lowered, "def")
                || ScoreEngine::contains_word(&lowered, "function")
                || ScoreEngine::contains_word(&lowered, "class"),
            has_comments: content.contains('#') || content.contains('/'),
            has_returns: ScoreEngine::contains_word(content, "return"),
            has_imports: ScoreEngine::contains_word(&lowered, "import")
                || ScoreEngine::contains_word(&lowered, "require")
                || ScoreEngine::contains_word(&lowered, "from"),
        }
    }

    fn structure_score(&self) -> f32 {
        let mut score = 0.0;
        if self.line_count > 50 {
            score += 0.3;
        }
        if self.has_functions {
            score += 0.2;
        }
        if self.has_returns {
            score += 0.2;
        }
        if self.has_imports {
            score += 0.1;
        }
        if self.has_comments {
            score += 0.2;
        }
        score
    }
}

pub(crate) fn letter_grade(score: f32) -> char {
    if score >= 0.8 {
        'A'
    } else if score >= 0.6 {
        'B'
    } else if score >= 0.4 {
        'C'
    } else {
        'D'
    }
}

/// Deterministic rule-based narrative used whenever the completion backend is
/// unavailable. Mirrors the section layout the backend is prompted for so
/// downstream rendering stays uniform.
pub(crate) fn narrative(request: &FeedbackRequest<'_>) -> String {
    let signals = ContentSignals::extract(request.content);
    let score = signals.structure_score();
    let grade = letter_grade(score);
    let verdict = if score >= 0.5 {
        "Pass"
    } else {
        "Needs Improvement"
    };

    let mut parts: Vec<String> = Vec::new();

    parts.push("**EXECUTIVE SUMMARY**".to_string());
    parts.push(format!("• Overall grade: **{grade}**"));
    parts.push(format!("• **Critical verdict**: {verdict}"));
    parts.push(format!(
        "• Submission length: {} lines, {} words",
        signals.line_count, signals.word_count
    ));
    parts.push(String::new());

    if signals.has_functions || signals.line_count > 30 {
        parts.push("**STRENGTHS**".to_string());
        if signals.has_functions {
            parts.push("• Work is organized with functions or classes".to_string());
        }
        if signals.line_count > 30 {
            parts.push("• Substantial implementation provided".to_string());
        }
        if signals.has_imports {
            parts.push("• Uses external libraries or modules appropriately".to_string());
        }
        parts.push(String::new());
    }

    parts.push("**REQUIREMENTS VERIFICATION**".to_string());
    parts.push(
        if signals.has_functions {
            "• **Structure**: PASS"
        } else {
            "• **Structure**: FAIL - organize the work into functions or sections"
        }
        .to_string(),
    );
    parts.push(
        if signals.has_comments {
            "• **Documentation**: PASS"
        } else {
            "• **Documentation**: FAIL - add comments explaining the approach"
        }
        .to_string(),
    );
    parts.push(
        if signals.line_count > 20 {
            "• **Completeness**: PASS"
        } else {
            "• **Completeness**: FAIL - expand the implementation"
        }
        .to_string(),
    );
    parts.push(String::new());

    let mut fixes: Vec<&str> = Vec::new();
    if !signals.has_comments {
        fixes.push("Add comments explaining the logic");
    }
    if !signals.has_functions && signals.line_count > 10 {
        fixes.push("Refactor into functions for better organization");
    }
    if signals.line_count < 20 {
        fixes.push("Expand the implementation with more detail");
    }
    if !fixes.is_empty() {
        parts.push("**IMMEDIATE FIXES REQUIRED**".to_string());
        for (index, fix) in fixes.iter().enumerate() {
            parts.push(format!("{}. {fix}", index + 1));
        }
        parts.push(String::new());
    }

    parts.push("**NEXT STEPS**".to_string());
    parts.push("• Review and add documentation".to_string());
    parts.push("• Test all functionality thoroughly".to_string());
    parts.push("• Resubmit for re-grading".to_string());
    parts.push(String::new());
    parts.push(format!(
        "**Final Grade: {grade} - Based on structure and completeness analysis**"
    ));

    parts.join("\n")
}
