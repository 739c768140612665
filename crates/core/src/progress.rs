//! Progress math shared by every front end.

/// Completion percentage for a lesson cursor, clamped to `[0, 100]`.
#[must_use]
pub fn completion_percent(current_lesson: u32, total_lessons: u32) -> f64 {
    if total_lessons == 0 {
        return 0.0;
    }
    let percent = f64::from(current_lesson) / f64::from(total_lessons) * 100.0;
    percent.clamp(0.0, 100.0)
}

/// Color band used when displaying a progress percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressColor {
    Red,
    Yellow,
    Blue,
    Green,
}

impl ProgressColor {
    /// Band for a completion percentage: red below 25, yellow below 50,
    /// blue below 75, green from there on.
    #[must_use]
    pub fn for_percent(percent: f64) -> Self {
        if percent >= 75.0 {
            Self::Green
        } else if percent >= 50.0 {
            Self::Blue
        } else if percent >= 25.0 {
            Self::Yellow
        } else {
            Self::Red
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_proportional_to_lessons() {
        assert!((completion_percent(30, 60) - 50.0).abs() < f64::EPSILON);
        assert!((completion_percent(15, 60) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_clamps_past_the_end() {
        assert!((completion_percent(75, 60) - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn percent_handles_empty_book() {
        assert!((completion_percent(1, 0)).abs() < f64::EPSILON);
    }

    #[test]
    fn color_bands_cover_the_range() {
        assert_eq!(ProgressColor::for_percent(0.0), ProgressColor::Red);
        assert_eq!(ProgressColor::for_percent(24.9), ProgressColor::Red);
        assert_eq!(ProgressColor::for_percent(25.0), ProgressColor::Yellow);
        assert_eq!(ProgressColor::for_percent(49.9), ProgressColor::Yellow);
        assert_eq!(ProgressColor::for_percent(50.0), ProgressColor::Blue);
        assert_eq!(ProgressColor::for_percent(74.9), ProgressColor::Blue);
        assert_eq!(ProgressColor::for_percent(75.0), ProgressColor::Green);
        assert_eq!(ProgressColor::for_percent(100.0), ProgressColor::Green);
    }
}
