//! Narrative bias screen.
//!
//! Flags evaluation narratives that lean on gendered language, age cues, or
//! remarks about appearance. Terms match on whole words, so "he" does not
//! fire inside "the".

use std::fmt;

use serde::{Deserialize, Serialize};

const MALE_TERMS: &[&str] = &["he", "him", "his", "man", "male", "son", "father", "husband"];
const FEMALE_TERMS: &[&str] = &["she", "her", "hers", "woman", "female", "daughter", "mother", "wife"];
const YOUNG_TERMS: &[&str] = &["young", "youthful", "junior", "millennial", "gen z"];
const OLD_TERMS: &[&str] = &["old", "older", "elderly", "senior", "veteran", "aged"];
const APPEARANCE_TERMS: &[&str] = &[
    "appearance",
    "looks",
    "height",
    "weight",
    "handsome",
    "pretty",
    "beautiful",
    "attractive",
    "fat",
    "thin",
];

/// Gendered term counts may differ by this much before the text is flagged.
const GENDER_IMBALANCE_TOLERANCE: usize = 2;
const GENDER_PENALTY: u32 = 30;
const AGE_PENALTY: u32 = 20;
const APPEARANCE_PENALTY: u32 = 50;

/// A narrative is fair at or above this score.
pub const FAIR_SCORE_THRESHOLD: u32 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasKind {
    Gender,
    Age,
    Appearance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BiasSeverity {
    Low,
    Medium,
    High,
}

impl fmt::Display for BiasSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BiasSeverity::Low => "low",
            BiasSeverity::Medium => "medium",
            BiasSeverity::High => "high",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiasFinding {
    pub kind: BiasKind,
    pub severity: BiasSeverity,
    pub description: String,
}

/// Outcome of screening one narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBiasCheck {
    pub gender_bias: bool,
    pub age_bias: bool,
    pub appearance_bias: bool,
    /// Sum of the penalties for each flagged kind, capped at 100.
    pub bias_score: u32,
    /// `100 - bias_score`
    pub fairness_score: u32,
    pub is_fair: bool,
    pub findings: Vec<BiasFinding>,
}

impl TextBiasCheck {
    fn clean() -> Self {
        Self {
            gender_bias: false,
            age_bias: false,
            appearance_bias: false,
            bias_score: 0,
            fairness_score: 100,
            is_fair: true,
            findings: Vec::new(),
        }
    }
}

/// Screen a narrative for biased language.
///
/// Gender is flagged when one side's distinct terms outnumber the other's by
/// more than two. Any age or appearance term is flagged.
pub fn check_text_bias(text: &str) -> TextBiasCheck {
    let words = WordIndex::new(text);
    let mut check = TextBiasCheck::clean();
    let mut penalty = 0;

    let male = words.count(MALE_TERMS);
    let female = words.count(FEMALE_TERMS);
    if male.abs_diff(female) > GENDER_IMBALANCE_TOLERANCE {
        check.gender_bias = true;
        penalty += GENDER_PENALTY;
        check.findings.push(BiasFinding {
            kind: BiasKind::Gender,
            severity: BiasSeverity::Medium,
            description: format!(
                "gendered wording is unbalanced ({} male, {} female terms)",
                male, female
            ),
        });
    }

    let age_terms = words.found(YOUNG_TERMS.iter().chain(OLD_TERMS));
    if !age_terms.is_empty() {
        check.age_bias = true;
        penalty += AGE_PENALTY;
        check.findings.push(BiasFinding {
            kind: BiasKind::Age,
            severity: BiasSeverity::Low,
            description: format!("age-related wording: {}", age_terms.join(", ")),
        });
    }

    let appearance_terms = words.found(APPEARANCE_TERMS.iter());
    if !appearance_terms.is_empty() {
        check.appearance_bias = true;
        penalty += APPEARANCE_PENALTY;
        check.findings.push(BiasFinding {
            kind: BiasKind::Appearance,
            severity: BiasSeverity::High,
            description: format!("remarks on appearance: {}", appearance_terms.join(", ")),
        });
    }

    check.bias_score = penalty.min(100);
    check.fairness_score = 100 - check.bias_score;
    check.is_fair = check.fairness_score >= FAIR_SCORE_THRESHOLD;
    check
}

/// Lowercased words joined by single spaces and padded at both ends, so a
/// phrase matches only on word boundaries.
struct WordIndex(String);

impl WordIndex {
    fn new(text: &str) -> Self {
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();
        Self(format!(" {} ", words.join(" ")))
    }

    fn contains(&self, term: &str) -> bool {
        self.0.contains(&format!(" {} ", term))
    }

    fn count(&self, terms: &[&str]) -> usize {
        terms.iter().filter(|t| self.contains(t)).count()
    }

    fn found<'a>(&self, terms: impl Iterator<Item = &'a &'a str>) -> Vec<&'a str> {
        terms.filter(|t| self.contains(t)).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_narrative_is_fair() {
        let check = check_text_bias(
            "Delivered the migration ahead of schedule and mentored two teammates.",
        );
        assert_eq!(check, TextBiasCheck::clean());
    }

    #[test]
    fn test_short_terms_match_whole_words_only() {
        // "the", "other", "share" and "method" contain gendered substrings.
        let check = check_text_bias("The other team will share the method. Then she left.");
        assert!(!check.gender_bias);
        assert!(check.is_fair);
    }

    #[test]
    fn test_unbalanced_gendered_wording_is_medium() {
        let check = check_text_bias("He is a man who, like his father, works hard.");
        assert!(check.gender_bias);
        assert_eq!(check.bias_score, 30);
        assert_eq!(check.fairness_score, 70);
        assert!(!check.is_fair);
        assert_eq!(check.findings[0].kind, BiasKind::Gender);
        assert_eq!(check.findings[0].severity, BiasSeverity::Medium);
        assert!(check.findings[0].description.contains("4 male, 0 female"));
    }

    #[test]
    fn test_small_gender_imbalance_is_tolerated() {
        let check = check_text_bias("He helped her and his manager.");
        assert!(!check.gender_bias);
    }

    #[test]
    fn test_age_wording_is_low_severity_but_still_fair() {
        let check = check_text_bias("Very energetic for a young engineer.");
        assert!(check.age_bias);
        assert_eq!(check.fairness_score, 80);
        assert!(check.is_fair);
        assert_eq!(check.findings[0].severity, BiasSeverity::Low);
        assert!(check.findings[0].description.contains("young"));
    }

    #[test]
    fn test_multi_word_age_term() {
        assert!(check_text_bias("Typical Gen-Z attitude").age_bias);
    }

    #[test]
    fn test_appearance_wording_is_high_severity() {
        let check = check_text_bias("Always has a PRETTY smile for clients");
        assert!(check.appearance_bias);
        assert_eq!(check.fairness_score, 50);
        assert!(!check.is_fair);
        assert_eq!(check.findings[0].severity, BiasSeverity::High);
    }

    #[test]
    fn test_penalties_accumulate_and_cap() {
        let check = check_text_bias(
            "He is a young man, handsome like his father, with good looks and height.",
        );
        assert!(check.gender_bias && check.age_bias && check.appearance_bias);
        assert_eq!(check.bias_score, 100);
        assert_eq!(check.fairness_score, 0);
        assert_eq!(check.findings.len(), 3);
    }
}
