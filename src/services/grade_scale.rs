use crate::core::config::GradingSettings;

/// Pre-grades are persisted as 1000x fixed point; 45_500 reads back as 45.5.
const PREGRADE_FIXED_POINT: f64 = 1000.0;

#[derive(Debug, Clone, Copy)]
pub(crate) struct GradeScale {
    min_grade: f64,
    max_grade: f64,
}

impl GradeScale {
    pub(crate) fn new(min_grade: f64, max_grade: f64) -> Self {
        Self { min_grade, max_grade }
    }

    pub(crate) fn from_settings(settings: &GradingSettings) -> Self {
        Self::new(settings.min_grade, settings.max_grade)
    }

    pub(crate) fn max_grade(&self) -> f64 {
        self.max_grade
    }

    /// Maps achieved points onto the grading scale.
    ///
    /// Zero (or negative) points map to the minimum grade, as does a work
    /// configured with `max_points <= 0` (undefined in the source system,
    /// guarded here).
    pub(crate) fn transform(&self, points: f64, max_points: f64) -> f64 {
        if points <= 0.0 || max_points <= 0.0 {
            return self.min_grade;
        }

        let scale = (self.max_grade - self.min_grade) / max_points;
        round_one_decimal(scale * points + self.min_grade)
    }

    /// In-person pre-grades are already on the grading scale; no scaling,
    /// only the fixed-point decode.
    pub(crate) fn from_pregrade(&self, pregrade: i64) -> f64 {
        round_one_decimal(pregrade as f64 / PREGRADE_FIXED_POINT)
    }
}

/// Fixed-point encode for storing a pre-grade.
pub(crate) fn encode_pregrade(value: f64) -> i64 {
    (value * PREGRADE_FIXED_POINT).round() as i64
}

/// Round half away from zero to one decimal place.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> GradeScale {
        GradeScale::new(20.0, 70.0)
    }

    #[test]
    fn zero_points_map_to_min_grade() {
        assert_eq!(scale().transform(0.0, 50.0), 20.0);
    }

    #[test]
    fn full_points_map_to_max_grade() {
        assert_eq!(scale().transform(50.0, 50.0), 70.0);
    }

    #[test]
    fn half_points_follow_the_scale() {
        // min=20, max=70, max_points=50 -> scale factor 1.0.
        assert_eq!(scale().transform(25.0, 50.0), 45.0);
    }

    #[test]
    fn transform_is_monotonic_in_points() {
        let scale = scale();
        let mut previous = scale.transform(0.0, 37.0);
        for step in 1..=370 {
            let grade = scale.transform(step as f64 / 10.0, 37.0);
            assert!(grade >= previous, "grade regressed at step {step}");
            previous = grade;
        }
    }

    #[test]
    fn zero_max_points_is_guarded() {
        assert_eq!(scale().transform(10.0, 0.0), 20.0);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 20 + (50/40) * 11 = 33.75 -> 33.8
        assert_eq!(scale().transform(11.0, 40.0), 33.8);
    }

    #[test]
    fn pregrade_is_decoded_without_scaling() {
        assert_eq!(scale().from_pregrade(45_500), 45.5);
        assert_eq!(scale().from_pregrade(70_000), 70.0);
        assert_eq!(scale().from_pregrade(0), 0.0);
    }

    #[test]
    fn pregrade_encode_round_trips() {
        assert_eq!(encode_pregrade(45.5), 45_500);
        assert_eq!(scale().from_pregrade(encode_pregrade(33.8)), 33.8);
    }
}
