use serde::{Deserialize, Serialize};

/// Eight-tier grade band applied to any 0-100 composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Critical,
    NeedsImprovement,
    Average,
    Solid,
    Good,
    Excellent,
    Outstanding,
    Exceptional,
}

struct Band {
    grade: Grade,
    min_score: f64,
    label: &'static str,
    description: &'static str,
    percentile: &'static str,
}

// Ordered from highest to lowest threshold; first match wins.
const BANDS: &[Band] = &[
    Band { grade: Grade::Exceptional, min_score: 95.0, label: "S+++", description: "Exceptional (top 1%)", percentile: "top 1%" },
    Band { grade: Grade::Outstanding, min_score: 90.0, label: "S++", description: "Outstanding (top 5%)", percentile: "top 5%" },
    Band { grade: Grade::Excellent, min_score: 85.0, label: "S+", description: "Excellent (top 10%)", percentile: "top 10%" },
    Band { grade: Grade::Good, min_score: 80.0, label: "A", description: "Good (top 20%)", percentile: "top 20%" },
    Band { grade: Grade::Solid, min_score: 75.0, label: "B+", description: "Solid (top 30%)", percentile: "top 30%" },
    Band { grade: Grade::Average, min_score: 70.0, label: "B", description: "Average (top 40%)", percentile: "top 40%" },
    Band { grade: Grade::NeedsImprovement, min_score: 60.0, label: "C", description: "Needs improvement (top 60%)", percentile: "top 60%" },
    Band { grade: Grade::Critical, min_score: f64::NEG_INFINITY, label: "D", description: "Focused improvement required (bottom 40%)", percentile: "bottom 40%" },
];

impl Grade {
    pub fn from_score(score: f64) -> Self {
        BANDS
            .iter()
            .find(|band| score >= band.min_score)
            .map(|band| band.grade)
            .unwrap_or(Grade::Critical)
    }

    fn band(self) -> &'static Band {
        // Every variant has exactly one band.
        BANDS
            .iter()
            .find(|band| band.grade == self)
            .unwrap_or(&BANDS[BANDS.len() - 1])
    }

    pub fn label(self) -> &'static str {
        self.band().label
    }

    pub fn description(self) -> &'static str {
        self.band().description
    }

    pub fn percentile(self) -> &'static str {
        self.band().percentile
    }

    /// Lowest score that earns this grade.
    pub fn min_score(self) -> f64 {
        self.band().min_score
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_take_higher_tier() {
        let cases = [
            (95.0, Grade::Exceptional),
            (90.0, Grade::Outstanding),
            (85.0, Grade::Excellent),
            (80.0, Grade::Good),
            (75.0, Grade::Solid),
            (70.0, Grade::Average),
            (60.0, Grade::NeedsImprovement),
        ];
        for (score, expected) in cases {
            assert_eq!(Grade::from_score(score), expected, "score {}", score);
        }
    }

    #[test]
    fn test_one_below_boundary_takes_lower_tier() {
        let cases = [
            (94.0, Grade::Outstanding),
            (89.0, Grade::Excellent),
            (84.0, Grade::Good),
            (79.0, Grade::Solid),
            (74.0, Grade::Average),
            (69.0, Grade::NeedsImprovement),
            (59.0, Grade::Critical),
        ];
        for (score, expected) in cases {
            assert_eq!(Grade::from_score(score), expected, "score {}", score);
        }
    }

    #[test]
    fn test_extremes() {
        assert_eq!(Grade::from_score(100.0), Grade::Exceptional);
        assert_eq!(Grade::from_score(0.0), Grade::Critical);
    }

    #[test]
    fn test_band_metadata() {
        assert_eq!(Grade::Exceptional.label(), "S+++");
        assert_eq!(Grade::Critical.percentile(), "bottom 40%");
        assert_eq!(Grade::Good.min_score(), 80.0);
        assert_eq!(Grade::Solid.to_string(), "B+");
    }

    #[test]
    fn test_grades_are_ordered() {
        assert!(Grade::Exceptional > Grade::Outstanding);
        assert!(Grade::NeedsImprovement > Grade::Critical);
    }
}
