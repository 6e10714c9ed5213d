use serde::{Deserialize, Serialize};

/// Text handed to the scorer. `filename` is carried for display only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisInput {
    pub text: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// The four independent sub-scores.
///
/// `formatting`, `keywords` and `grammar` are always in 0..=100.
/// `readability` is capped at 100 but has no floor and can go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub formatting: i32,
    pub keywords: i32,
    pub grammar: i32,
    pub readability: i32,
}

impl ScoreBreakdown {
    /// Rounded unweighted mean of the four sub-scores.
    pub fn overall(&self) -> i32 {
        let sum = self.formatting + self.keywords + self.grammar + self.readability;
        round_half_up(sum as f64 / 4.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityMetrics {
    pub sentence_count: usize,
    /// Rounded to one decimal. 0.0 when no sentence was detected.
    pub avg_words_per_sentence: f64,
    pub complex_word_count: usize,
}

/// Full scorer output. Computed fresh for every input and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall_score: i32,
    pub scores: ScoreBreakdown,
    pub suggestions: Vec<String>,
    pub keywords_found: Vec<String>,
    pub grammar_issues: Vec<String>,
    pub readability_metrics: ReadabilityMetrics,
}

/// Rounds to the nearest integer with halves going toward positive infinity,
/// so `-2.5` becomes `-2` and `2.5` becomes `3`.
pub fn round_half_up(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}
