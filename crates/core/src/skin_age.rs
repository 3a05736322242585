//! Skin-age estimation.
//!
//! Combines per-category detection counts with a base (chronological) age
//! into a derived skin age and a categorical assessment. Pure and total:
//! every input produces an estimate, nothing here performs I/O.

use serde::{Deserialize, Serialize};

use crate::bands::band_lookup;
use crate::types::{Category, HasConditionCounts};

/// Base age used when the real age is unknown.
pub const DEFAULT_BASE_AGE: f64 = 30.0;

/// Lowest derived skin age.
pub const MIN_SKIN_AGE: f64 = 18.0;

/// Highest derived skin age.
pub const MAX_SKIN_AGE: f64 = 80.0;

/// Acne: many active spots read as younger skin, none at all as more mature.
pub const ACNE_AGE_BANDS: &[(u32, i32)] = &[(11, -2), (6, -1), (1, 0), (0, 1)];

/// Wrinkles add up to five years in four increasing bands.
pub const WRINKLE_AGE_BANDS: &[(u32, i32)] = &[(16, 5), (11, 3), (6, 2), (1, 1), (0, 0)];

/// Under-eye bags.
pub const EYEBAG_AGE_BANDS: &[(u32, i32)] = &[(4, 3), (1, 1), (0, 0)];

/// Redness regions.
pub const REDNESS_AGE_BANDS: &[(u32, i32)] = &[(6, 2), (1, 1), (0, 0)];

/// Age-delta table for a category.
#[must_use]
pub const fn age_bands(category: Category) -> &'static [(u32, i32)] {
    match category {
        Category::Acne => ACNE_AGE_BANDS,
        Category::Wrinkle => WRINKLE_AGE_BANDS,
        Category::Eyebag => EYEBAG_AGE_BANDS,
        Category::Redness => REDNESS_AGE_BANDS,
    }
}

/// Years a single category's count adds to (or removes from) the base age.
#[must_use]
pub fn age_delta(category: Category, count: u32) -> i32 {
    band_lookup(age_bands(category), count).unwrap_or(0)
}

/// How the derived skin age compares to the base age.
///
/// Bands over `difference = skin_age - base_age`:
/// `< -3`, `[-3, 0)`, `= 0`, `(0, 3)`, `>= 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeAssessment {
    Younger,
    CloseAndYoung,
    Matches,
    SlightlyOlder,
    Older,
}

impl AgeAssessment {
    /// Classify a signed age difference.
    ///
    /// Exactly `-3` falls in [`AgeAssessment::CloseAndYoung`], exactly `3` in
    /// [`AgeAssessment::Older`].
    #[must_use]
    pub fn from_difference(difference: f64) -> Self {
        if difference < -3.0 {
            Self::Younger
        } else if difference < 0.0 {
            Self::CloseAndYoung
        } else if difference == 0.0 {
            Self::Matches
        } else if difference < 3.0 {
            Self::SlightlyOlder
        } else {
            Self::Older
        }
    }

    /// User-facing assessment message.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::Younger => "Cildiniz gerçek yaşınızdan daha genç görünüyor!",
            Self::CloseAndYoung => "Cildiniz gerçek yaşınıza yakın ve genç görünüyor.",
            Self::Matches => "Cildiniz gerçek yaşınızla uyumlu.",
            Self::SlightlyOlder => "Cildiniz gerçek yaşınızdan biraz daha olgun görünüyor.",
            Self::Older => "Cildiniz gerçek yaşınızdan daha olgun görünüyor.",
        }
    }
}

/// Result of [`estimate_skin_age`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkinAgeEstimate {
    /// Derived skin age, clamped to `[18, 80]` and rounded to one decimal.
    pub value: f64,
    /// Base age the estimate started from.
    pub base_age: f64,
    /// `clamped skin age - base age`.
    pub difference: f64,
    /// Categorical assessment of `difference`.
    pub assessment: AgeAssessment,
}

impl SkinAgeEstimate {
    /// Assessment message for display and persistence.
    #[must_use]
    pub const fn assessment_text(&self) -> &'static str {
        self.assessment.message()
    }
}

/// Estimate skin age from detection counts.
///
/// `base_age` falls back to [`DEFAULT_BASE_AGE`] when absent or not finite.
#[must_use]
pub fn estimate_skin_age(counts: &impl HasConditionCounts, base_age: Option<f64>) -> SkinAgeEstimate {
    let base_age = base_age
        .filter(|age| age.is_finite())
        .unwrap_or(DEFAULT_BASE_AGE);
    let counts = counts.condition_counts();

    let delta: i32 = counts
        .iter()
        .map(|(category, count)| age_delta(category, count))
        .sum();

    let skin_age = (base_age + f64::from(delta)).clamp(MIN_SKIN_AGE, MAX_SKIN_AGE);
    let difference = skin_age - base_age;

    SkinAgeEstimate {
        value: round_one_decimal(skin_age),
        base_age,
        difference,
        assessment: AgeAssessment::from_difference(difference),
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bands::is_well_ordered;
    use crate::types::ConditionCounts;

    #[test]
    fn test_tables_are_well_ordered() {
        for category in Category::ALL {
            assert!(is_well_ordered(age_bands(category)), "{category}");
        }
    }

    #[test]
    fn test_no_findings_adds_maturity_year() {
        let estimate = estimate_skin_age(&ConditionCounts::default(), Some(30.0));
        assert!((estimate.value - 31.0).abs() < f64::EPSILON);
        assert!((estimate.difference - 1.0).abs() < f64::EPSILON);
        assert_eq!(estimate.assessment, AgeAssessment::SlightlyOlder);
        assert!(estimate.assessment_text().contains("biraz daha olgun"));
    }

    #[test]
    fn test_heavy_findings() {
        let counts = ConditionCounts::new(12, 16, 4, 6);
        assert_eq!(age_delta(Category::Acne, 12), -2);
        assert_eq!(age_delta(Category::Wrinkle, 16), 5);
        assert_eq!(age_delta(Category::Eyebag, 4), 3);
        assert_eq!(age_delta(Category::Redness, 6), 2);

        let estimate = estimate_skin_age(&counts, Some(30.0));
        assert!((estimate.value - 38.0).abs() < f64::EPSILON);
        assert!((estimate.difference - 8.0).abs() < f64::EPSILON);
        assert_eq!(estimate.assessment, AgeAssessment::Older);
    }

    #[test]
    fn test_missing_base_age_defaults_to_thirty() {
        let estimate = estimate_skin_age(&ConditionCounts::new(3, 0, 0, 0), None);
        assert!((estimate.base_age - DEFAULT_BASE_AGE).abs() < f64::EPSILON);
        assert!((estimate.value - 30.0).abs() < f64::EPSILON);
        assert_eq!(estimate.assessment, AgeAssessment::Matches);

        let estimate = estimate_skin_age(&ConditionCounts::default(), Some(f64::NAN));
        assert!((estimate.base_age - DEFAULT_BASE_AGE).abs() < f64::EPSILON);
    }

    #[test]
    fn test_acne_bands() {
        assert_eq!(age_delta(Category::Acne, 0), 1);
        assert_eq!(age_delta(Category::Acne, 1), 0);
        assert_eq!(age_delta(Category::Acne, 5), 0);
        assert_eq!(age_delta(Category::Acne, 6), -1);
        assert_eq!(age_delta(Category::Acne, 10), -1);
        assert_eq!(age_delta(Category::Acne, 11), -2);
    }

    #[test]
    fn test_wrinkle_bands() {
        assert_eq!(age_delta(Category::Wrinkle, 0), 0);
        assert_eq!(age_delta(Category::Wrinkle, 1), 1);
        assert_eq!(age_delta(Category::Wrinkle, 6), 2);
        assert_eq!(age_delta(Category::Wrinkle, 11), 3);
        assert_eq!(age_delta(Category::Wrinkle, 15), 3);
        assert_eq!(age_delta(Category::Wrinkle, 16), 5);
    }

    #[test]
    fn test_eyebag_and_redness_bands() {
        assert_eq!(age_delta(Category::Eyebag, 3), 1);
        assert_eq!(age_delta(Category::Eyebag, 4), 3);
        assert_eq!(age_delta(Category::Redness, 5), 1);
        assert_eq!(age_delta(Category::Redness, 6), 2);
    }

    #[test]
    fn test_skin_age_always_within_bounds() {
        let samples = [0_u32, 1, 3, 4, 5, 6, 10, 11, 15, 16, 1_000, u32::MAX];
        let bases = [0.0, 17.5, 18.0, 30.0, 79.0, 80.0, 150.0];
        for &a in &samples {
            for &w in &samples {
                for &e in &samples {
                    for &r in &samples {
                        for &base in &bases {
                            let counts = ConditionCounts::new(a, w, e, r);
                            let estimate = estimate_skin_age(&counts, Some(base));
                            assert!(
                                (MIN_SKIN_AGE..=MAX_SKIN_AGE).contains(&estimate.value),
                                "{counts:?} base {base} -> {}",
                                estimate.value
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_clamping_to_floor_and_ceiling() {
        let estimate = estimate_skin_age(&ConditionCounts::new(20, 0, 0, 0), Some(18.0));
        assert!((estimate.value - MIN_SKIN_AGE).abs() < f64::EPSILON);
        assert!(estimate.difference.abs() < f64::EPSILON);

        let estimate = estimate_skin_age(&ConditionCounts::new(0, 20, 5, 9), Some(79.0));
        assert!((estimate.value - MAX_SKIN_AGE).abs() < f64::EPSILON);
        assert!((estimate.difference - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_value_rounded_to_one_decimal() {
        let estimate = estimate_skin_age(&ConditionCounts::new(1, 0, 0, 0), Some(27.46));
        assert!((estimate.value - 27.5).abs() < 1e-9);
    }

    #[test]
    fn test_assessment_band_boundaries() {
        assert_eq!(AgeAssessment::from_difference(-3.5), AgeAssessment::Younger);
        assert_eq!(AgeAssessment::from_difference(-3.0), AgeAssessment::CloseAndYoung);
        assert_eq!(AgeAssessment::from_difference(-0.5), AgeAssessment::CloseAndYoung);
        assert_eq!(AgeAssessment::from_difference(0.0), AgeAssessment::Matches);
        assert_eq!(AgeAssessment::from_difference(2.9), AgeAssessment::SlightlyOlder);
        assert_eq!(AgeAssessment::from_difference(3.0), AgeAssessment::Older);
        assert_eq!(AgeAssessment::from_difference(40.0), AgeAssessment::Older);
    }

    #[test]
    fn test_assessment_messages_are_distinct() {
        let all = [
            AgeAssessment::Younger,
            AgeAssessment::CloseAndYoung,
            AgeAssessment::Matches,
            AgeAssessment::SlightlyOlder,
            AgeAssessment::Older,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in all.iter().skip(i + 1) {
                assert_ne!(a.message(), b.message());
            }
        }
    }
}
