use crate::workflows::submissions::evaluation::{ScoreEngine, ScoringConfig};

fn engine() -> ScoreEngine {
    ScoreEngine::default()
}

#[test]
fn scores_stay_in_unit_interval() {
    let engine = engine();
    let long_code = "import os\ndef main():\n    return os.name\n\n".repeat(40);
    let long_prose = "word ".repeat(500);
    let fixtures: [&str; 5] = [
        "",
        "x",
        "def f():\n    return 1\n",
        &long_code,
        &long_prose,
    ];

    for content in fixtures {
        let scores = engine.score(content);
        for value in [scores.correctness, scores.quality, scores.completeness] {
            assert!((0.0..=1.0).contains(&value), "score {value} out of range");
        }
    }
}

#[test]
fn scoring_is_deterministic() {
    let engine = engine();
    let content = "def add(a, b):\n    return a + b\n";
    assert_eq!(engine.score(content), engine.score(content));
}

#[test]
fn short_function_with_return_clears_half_credit() {
    let engine = engine();
    // base 0.3 + function keyword 0.25 + return keyword 0.15
    let score = engine.score_correctness("def add(a, b):\n    return a + b\n");
    assert!((score - 0.70).abs() < 1e-4);
    assert!(score >= 0.55);
}

#[test]
fn keyword_checks_respect_token_boundaries() {
    let engine = engine();
    // "defined" and "returned" must not count as "def" / "return"
    let score = engine.score_correctness("the defined value is returned later");
    assert!((score - 0.3).abs() < 1e-4);
}

#[test]
fn long_content_earns_length_bonus() {
    let engine = engine();
    let long = "def main():\n    return 0\n".repeat(20);
    let short = "def main():\n    return 0\n";
    assert!(engine.score_correctness(&long) > engine.score_correctness(short));
}

#[test]
fn camel_case_forfeits_naming_bonus() {
    let engine = engine();
    let snake = "value_total = 1\n";
    let camel = "valueTotal = 1\n";
    assert!(engine.score_quality(snake) > engine.score_quality(camel));
}

#[test]
fn commented_code_earns_quality_bonus() {
    let engine = engine();
    let commented = "# setup\n# parse\n# compute\n# emit\nx = 1\n";
    let bare = "x = 1\n";
    assert!(engine.score_quality(commented) > engine.score_quality(bare));
}

#[test]
fn completeness_blends_words_and_lines() {
    let engine = engine();

    // 300 words on one line saturate the word component only: 0.6 + 0.4 * 1/30
    let one_line = "word ".repeat(300);
    let expected = 0.6 + 0.4 * (1.0 / 30.0);
    assert!((engine.score_completeness(one_line.trim_end()) - expected).abs() < 1e-4);

    assert!(engine.score_completeness("").abs() < 1e-6);
}

#[test]
fn completeness_saturates_at_one() {
    let engine = engine();
    let large = "word word word word word word word word word word\n".repeat(60);
    assert!((engine.score_completeness(&large) - 1.0).abs() < 1e-4);
}

#[test]
fn suspicious_phrases_flag_plagiarism() {
    let engine = engine();
    let report = engine.check_plagiarism("I just Copy this and Paste it from a friend");
    assert!(report.flagged);
    assert!((report.similarity - 0.9).abs() < 1e-4);
    assert!((report.confidence - 0.95).abs() < 1e-4);
    assert!(!report.suggestions.is_empty());
}

#[test]
fn ordinary_content_passes_plagiarism_check() {
    let engine = engine();
    let report = engine.check_plagiarism("def add(a, b):\n    return a + b\n");
    assert!(!report.flagged);
    assert!((report.similarity - 0.6).abs() < 1e-4);
    assert!((report.confidence - 0.7).abs() < 1e-4);
    assert!(report.suggestions.is_empty());
}

#[test]
fn phrase_order_matters_for_plagiarism() {
    let engine = engine();
    // "paste" only before "copy" does not match the ordered pattern
    let reversed = engine.check_plagiarism("paste the values, then copy the result");
    assert!(!reversed.flagged);

    let ordered = engine.check_plagiarism("copy it here and paste it there");
    assert!(ordered.flagged);
}

#[test]
fn raised_threshold_suppresses_flag() {
    let engine = ScoreEngine::new(ScoringConfig {
        plagiarism_threshold: 0.95,
        ..ScoringConfig::default()
    });
    let report = engine.check_plagiarism("copy and paste from a website");
    assert!(!report.flagged);
}
