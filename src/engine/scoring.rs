//! Point values and star thresholds.

use crate::domain::{StarRating, StepDescriptor};

/// Points awarded for each accepted interaction.
pub const POINTS_PER_INTERACTION: u32 = 10;

/// Scoring parameters. Fixed in production; exposed so tests can pin them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScoringRules {
    pub points_per_interaction: u32,
    /// Minimum percentage (inclusive) for three stars.
    pub three_star_percent: u32,
    /// Minimum percentage (inclusive) for two stars.
    pub two_star_percent: u32,
    /// Minimum percentage for one star. Anything below still earns one star.
    pub one_star_percent: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            points_per_interaction: POINTS_PER_INTERACTION,
            three_star_percent: 90,
            two_star_percent: 70,
            one_star_percent: 50,
        }
    }
}

impl ScoringRules {
    /// Sum of `required_interactions * points_per_interaction` over all steps.
    pub fn max_points(&self, steps: &[StepDescriptor]) -> u32 {
        steps
            .iter()
            .map(|s| s.required_interactions * self.points_per_interaction)
            .sum()
    }

    /// Percentage of `max` earned; 0 when nothing was obtainable.
    pub fn percentage(&self, points: u32, max: u32) -> f64 {
        if max == 0 {
            return 0.0;
        }
        100.0 * f64::from(points) / f64::from(max)
    }

    /// Bucket `points / max` into 1..=3 stars. Compared in integers so the
    /// thresholds are exact.
    pub fn stars(&self, points: u32, max: u32) -> StarRating {
        if max == 0 {
            return StarRating::ONE;
        }
        let scaled = u64::from(points) * 100;
        let at_least = |percent: u32| scaled >= u64::from(percent) * u64::from(max);

        if at_least(self.three_star_percent) {
            StarRating::THREE
        } else if at_least(self.two_star_percent) {
            StarRating::TWO
        } else if at_least(self.one_star_percent) {
            StarRating::ONE
        } else {
            // no zero-star outcome
            StarRating::ONE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ninety_percent_is_three_stars() {
        let rules = ScoringRules::default();
        assert_eq!(rules.stars(90, 100), StarRating::THREE);
        assert_eq!(rules.stars(89, 100), StarRating::TWO);
    }

    #[test]
    fn seventy_percent_is_two_stars() {
        let rules = ScoringRules::default();
        assert_eq!(rules.stars(70, 100), StarRating::TWO);
        assert_eq!(rules.stars(69, 100), StarRating::ONE);
    }

    #[test]
    fn low_scores_still_earn_one_star() {
        let rules = ScoringRules::default();
        assert_eq!(rules.stars(50, 100), StarRating::ONE);
        assert_eq!(rules.stars(10, 100), StarRating::ONE);
        assert_eq!(rules.stars(0, 100), StarRating::ONE);
    }

    #[test]
    fn zero_max_is_zero_percent_and_one_star() {
        let rules = ScoringRules::default();
        assert_eq!(rules.percentage(0, 0), 0.0);
        assert_eq!(rules.stars(0, 0), StarRating::ONE);
    }

    #[test]
    fn over_scoring_caps_at_three_stars() {
        let rules = ScoringRules::default();
        assert_eq!(rules.stars(250, 180), StarRating::THREE);
    }

    #[test]
    fn thresholds_hold_for_uneven_maximums() {
        let rules = ScoringRules::default();
        // 160 / 180 = 88.9%
        assert_eq!(rules.stars(160, 180), StarRating::TWO);
        // 170 / 180 = 94.4%
        assert_eq!(rules.stars(170, 180), StarRating::THREE);
    }
}
