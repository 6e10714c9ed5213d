//! Resume Heuristic Scorer: a pure function from resume text to `AnalysisResult`.
//!
//! Four independent sub-scores are computed, each rounded on its own, and the
//! overall score is the rounded mean of the rounded sub-scores. Suggestions are
//! emitted in a fixed check order so the client can render them stably.
//!
//! The scorer is total: empty, whitespace-only and pathological inputs all
//! produce a result. Deciding whether to call it for blank input is the
//! caller's job (see `scheduler` and the analyze handler).

use std::sync::OnceLock;

use regex::Regex;

use crate::analysis::keywords::KEYWORD_VOCABULARY;
use crate::analysis::models::{round_half_up, AnalysisResult, ReadabilityMetrics, ScoreBreakdown};

const GRAMMAR_PENALTY: f64 = 15.0;
const MIN_LENGTH: usize = 200;
const MAX_LENGTH: usize = 5000;
const COMPLEX_WORD_MIN_CHARS: usize = 8;
const TARGET_WORDS_PER_SENTENCE: f64 = 15.0;

pub const ISSUE_LOWERCASE_I: &str = "Use a capital 'I' when referring to yourself";
pub const ISSUE_MISSING_END_PUNCTUATION: &str = "Text should end with proper punctuation";
pub const ISSUE_DOUBLE_SPACE: &str = "Remove double spaces between words";

pub const SUGGEST_KEYWORDS: &str =
    "Add more industry-relevant keywords and technical skills to get past applicant tracking systems";
pub const SUGGEST_GRAMMAR: &str = "Review your resume for grammar and punctuation errors";
pub const SUGGEST_READABILITY: &str =
    "Simplify your sentence structure to make the resume easier to read";
pub const SUGGEST_FORMATTING: &str =
    "Use consistent formatting and make sure your contact information is included";
pub const SUGGEST_TECHNICAL_SKILLS: &str =
    "List specific technical skills such as programming languages and frameworks";

// ────────────────────────────────────────────────────────────────────────────
// Entry point
// ────────────────────────────────────────────────────────────────────────────

/// Scores `text`. Never fails and holds no state between calls.
pub fn analyze(text: &str) -> AnalysisResult {
    let (keyword_score, keywords_found) = score_keywords(text);
    let (grammar_score, grammar_issues) = score_grammar(text);
    let (readability_score, readability_metrics) = score_readability(text);
    let formatting_score = score_formatting(text);

    let scores = ScoreBreakdown {
        formatting: round_half_up(formatting_score),
        keywords: round_half_up(keyword_score),
        grammar: round_half_up(grammar_score),
        readability: round_half_up(readability_score),
    };

    let suggestions = build_suggestions(&scores, keywords_found.len());

    AnalysisResult {
        overall_score: scores.overall(),
        scores,
        suggestions,
        keywords_found,
        grammar_issues,
        readability_metrics,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Sub-scores
// ────────────────────────────────────────────────────────────────────────────

/// Case-insensitive substring match against the vocabulary. Matches are
/// returned in vocabulary order.
fn score_keywords(text: &str) -> (f64, Vec<String>) {
    let lower = text.to_lowercase();
    let found: Vec<String> = KEYWORD_VOCABULARY
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| term.to_string())
        .collect();

    let score = (found.len() as f64 / KEYWORD_VOCABULARY.len() as f64 * 100.0).min(100.0);
    (score, found)
}

fn score_grammar(text: &str) -> (f64, Vec<String>) {
    let mut issues = Vec::new();

    if text.contains(" i ") {
        issues.push(ISSUE_LOWERCASE_I.to_string());
    }

    let ends_with_punctuation = matches!(text.trim().chars().last(), Some('.' | '!' | '?'));
    if !ends_with_punctuation {
        issues.push(ISSUE_MISSING_END_PUNCTUATION.to_string());
    }

    if text.contains("  ") {
        issues.push(ISSUE_DOUBLE_SPACE.to_string());
    }

    let score = (100.0 - GRAMMAR_PENALTY * issues.len() as f64).max(0.0);
    (score, issues)
}

/// Readability is capped at 100 but deliberately left without a floor.
fn score_readability(text: &str) -> (f64, ReadabilityMetrics) {
    let sentence_count = text
        .split(['.', '!', '?'])
        .filter(|fragment| !fragment.trim().is_empty())
        .count();

    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();
    let complex_word_count = words
        .iter()
        .filter(|w| w.chars().count() >= COMPLEX_WORD_MIN_CHARS)
        .count();

    // No sentence or no word: fall back to 0 instead of NaN.
    let avg_words_per_sentence = if sentence_count == 0 {
        0.0
    } else {
        word_count as f64 / sentence_count as f64
    };
    let complex_ratio = if word_count == 0 {
        0.0
    } else {
        complex_word_count as f64 / word_count as f64
    };

    let score = (100.0
        - (avg_words_per_sentence - TARGET_WORDS_PER_SENTENCE).abs() * 2.0
        - complex_ratio * 50.0)
        .min(100.0);

    let metrics = ReadabilityMetrics {
        sentence_count,
        avg_words_per_sentence: round_half_up(avg_words_per_sentence * 10.0) as f64 / 10.0,
        complex_word_count,
    };

    (score, metrics)
}

fn score_formatting(text: &str) -> f64 {
    let length = text.chars().count();
    let mut score = 100.0;

    if length < MIN_LENGTH {
        score -= 30.0;
    }
    if length > MAX_LENGTH {
        score -= 20.0;
    }
    if !text.contains('@') {
        score -= 10.0;
    }
    if !year_pattern().is_match(text) {
        score -= 10.0;
    }

    f64::max(score, 0.0)
}

fn year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // ASCII word boundaries: a year glued to a non-ASCII letter ("é2023") still counts.
    PATTERN.get_or_init(|| {
        Regex::new(r"(?-u:\b)[0-9]{4}(?-u:\b)").expect("year pattern is a valid regex")
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Suggestions
// ────────────────────────────────────────────────────────────────────────────

fn build_suggestions(scores: &ScoreBreakdown, matched_keywords: usize) -> Vec<String> {
    let checks = [
        (scores.keywords < 60, SUGGEST_KEYWORDS),
        (scores.grammar < 80, SUGGEST_GRAMMAR),
        (scores.readability < 70, SUGGEST_READABILITY),
        (scores.formatting < 80, SUGGEST_FORMATTING),
        (matched_keywords < 5, SUGGEST_TECHNICAL_SKILLS),
    ];

    checks
        .into_iter()
        .filter(|(fired, _)| *fired)
        .map(|(_, suggestion)| suggestion.to_string())
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO_B: &str = "I am a software engineer with experience in react and python.";

    fn long_resume() -> String {
        let mut text = String::from("Contact john@example.com for details. Graduated in 2023. ");
        text.push_str(&"Built reliable services for customers. ".repeat(150));
        text.trim_end().to_string()
    }

    fn samples() -> Vec<String> {
        vec![
            String::new(),
            " ".to_string(),
            "x".to_string(),
            "Resume".to_string(),
            "?!.".to_string(),
            SCENARIO_B.to_string(),
            "Hi  there.".to_string(),
            "and i went there".to_string(),
            "Senior engineer. Led agile scrum teams! Built docker and kubernetes tooling?".to_string(),
            "a".repeat(500),
            long_resume(),
        ]
    }

    #[test]
    fn test_sub_scores_bounded_except_readability_floor() {
        for text in samples() {
            let result = analyze(&text);
            let s = &result.scores;
            for score in [s.formatting, s.keywords, s.grammar] {
                assert!((0..=100).contains(&score), "score {score} out of range for {text:?}");
            }
            assert!(s.readability <= 100, "readability {} above cap", s.readability);
        }
    }

    #[test]
    fn test_readability_can_go_negative() {
        // 200 long words, no sentence punctuation: avg = 200, every word complex.
        let text = vec!["extraordinary"; 200].join(" ");
        let result = analyze(&text);
        assert_eq!(result.readability_metrics.sentence_count, 1);
        // 100 - |200 - 15| * 2 - 50 = -320
        assert_eq!(result.scores.readability, -320);
        assert!(result.overall_score < 0);
    }

    #[test]
    fn test_single_long_word_readability() {
        let result = analyze(&"a".repeat(500));
        // 100 - |1 - 15| * 2 - 1.0 * 50 = 22
        assert_eq!(result.scores.readability, 22);
    }

    #[test]
    fn test_overall_is_rounded_mean_of_sub_scores() {
        for text in samples() {
            let result = analyze(&text);
            let s = &result.scores;
            let mean = (s.formatting + s.keywords + s.grammar + s.readability) as f64 / 4.0;
            assert_eq!(result.overall_score, round_half_up(mean), "input {text:?}");
        }
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let lower = analyze("python and react developer with aws");
        let upper = analyze("PYTHON AND REACT DEVELOPER WITH AWS");
        let mixed = analyze("Python and React Developer with Aws");
        assert_eq!(lower.keywords_found, upper.keywords_found);
        assert_eq!(lower.keywords_found, mixed.keywords_found);
        assert_eq!(lower.scores.keywords, upper.scores.keywords);
        assert_eq!(lower.scores.keywords, mixed.scores.keywords);
    }

    #[test]
    fn test_keywords_match_inside_words() {
        let result = analyze("Wrote javascript daily");
        assert!(result.keywords_found.contains(&"javascript".to_string()));
        assert!(result.keywords_found.contains(&"java".to_string()));
    }

    #[test]
    fn test_keywords_found_in_vocabulary_order() {
        let result = analyze("skills: python, react");
        assert_eq!(result.keywords_found, vec!["react", "python", "skills"]);
    }

    #[test]
    fn test_keyword_score_capped_at_100() {
        let everything = KEYWORD_VOCABULARY.join(" ");
        let result = analyze(&everything);
        assert_eq!(result.scores.keywords, 100);
        assert_eq!(result.keywords_found.len(), KEYWORD_VOCABULARY.len());
    }

    #[test]
    fn test_analyze_is_idempotent() {
        for text in samples() {
            assert_eq!(analyze(&text), analyze(&text));
        }
    }

    #[test]
    fn test_scenario_b_short_sentence() {
        let result = analyze(SCENARIO_B);

        assert_eq!(result.scores.grammar, 100);
        assert!(result.grammar_issues.is_empty());
        assert_eq!(result.scores.formatting, 50);
        for kw in ["react", "python", "experience"] {
            assert!(result.keywords_found.contains(&kw.to_string()), "missing {kw}");
        }
        // 3 of 28 terms
        assert_eq!(result.keywords_found.len(), 3);
        assert_eq!(result.scores.keywords, 11);

        // 11 words, 1 sentence, 3 complex words: 100 - 8 - 3/11*50 = 78.36
        assert_eq!(result.readability_metrics.sentence_count, 1);
        assert_eq!(result.readability_metrics.avg_words_per_sentence, 11.0);
        assert_eq!(result.readability_metrics.complex_word_count, 3);
        assert_eq!(result.scores.readability, 78);

        assert_eq!(result.overall_score, 60);
        assert_eq!(
            result.suggestions,
            vec![SUGGEST_KEYWORDS, SUGGEST_FORMATTING, SUGGEST_TECHNICAL_SKILLS]
        );
    }

    #[test]
    fn test_scenario_c_long_text_with_contact_and_year() {
        let text = long_resume();
        assert!(text.chars().count() > MAX_LENGTH);
        assert!(!text.contains("  "));

        let result = analyze(&text);
        assert_eq!(result.scores.formatting, 80);
        assert_eq!(result.scores.grammar, 100);
    }

    #[test]
    fn test_scenario_d_double_space() {
        let result = analyze("Hi  there.");
        assert_eq!(result.scores.grammar, 85);
        assert_eq!(result.grammar_issues, vec![ISSUE_DOUBLE_SPACE]);
    }

    #[test]
    fn test_scenario_e_single_word() {
        let result = analyze("Resume");
        assert_eq!(result.readability_metrics.sentence_count, 1);
        assert!(result.readability_metrics.avg_words_per_sentence.is_finite());
    }

    #[test]
    fn test_zero_sentences_falls_back_to_zero_average() {
        for text in ["?!.", "", "   ", "...\n!!"] {
            let result = analyze(text);
            assert_eq!(result.readability_metrics.sentence_count, 0, "input {text:?}");
            assert_eq!(result.readability_metrics.avg_words_per_sentence, 0.0);
        }
    }

    #[test]
    fn test_empty_text_scores_without_fault() {
        let result = analyze("");
        // avg 0 → 100 - 30 = 70, no words → no complex penalty
        assert_eq!(result.scores.readability, 70);
        assert_eq!(result.scores.grammar, 85);
        assert_eq!(result.scores.formatting, 50);
        assert_eq!(result.scores.keywords, 0);
    }

    #[test]
    fn test_grammar_issue_order_and_floor() {
        let result = analyze("so i said  hello");
        assert_eq!(
            result.grammar_issues,
            vec![ISSUE_LOWERCASE_I, ISSUE_MISSING_END_PUNCTUATION, ISSUE_DOUBLE_SPACE]
        );
        assert_eq!(result.scores.grammar, 55);
    }

    #[test]
    fn test_trailing_whitespace_after_punctuation_is_fine() {
        let result = analyze("Shipped the release!   \n");
        assert!(!result
            .grammar_issues
            .contains(&ISSUE_MISSING_END_PUNCTUATION.to_string()));
    }

    #[test]
    fn test_year_requires_exactly_four_digits() {
        let with_year = score_formatting("Graduated 2019 @");
        let with_long_number = score_formatting("Phone 5551234 @");
        assert_eq!(with_year - with_long_number, 10.0);
    }

    #[test]
    fn test_year_boundary_is_ascii_only() {
        assert_eq!(score_formatting("é2023 @"), 70.0);
        assert_eq!(score_formatting("x2023 @"), 60.0);
    }

    #[test]
    fn test_formatting_floor_at_zero_not_reached() {
        // Worst case is -30 -10 -10 = 50; the two length rules cannot both fire.
        assert_eq!(score_formatting(""), 50.0);
    }

    #[test]
    fn test_complex_word_threshold() {
        let result = analyze("abcdefg abcdefgh.");
        assert_eq!(result.readability_metrics.complex_word_count, 1);
    }

    #[test]
    fn test_average_rounded_to_one_decimal() {
        // 7 words across 3 sentences = 2.333..
        let result = analyze("One two. Three four. Five six seven.");
        assert_eq!(result.readability_metrics.sentence_count, 3);
        assert_eq!(result.readability_metrics.avg_words_per_sentence, 2.3);
    }

    #[test]
    fn test_keyword_and_skill_suggestions_can_co_fire() {
        let result = analyze("");
        assert!(result.suggestions.contains(&SUGGEST_KEYWORDS.to_string()));
        assert!(result.suggestions.contains(&SUGGEST_TECHNICAL_SKILLS.to_string()));
    }
}
