//! Priority scoring for reservation requests.
//!
//! `score` is pure: the same inputs always produce the same breakdown. It runs
//! once at submission and the result is stored on the reservation.

use serde::{Deserialize, Serialize};

use crate::model::{Category, DAY_MS, Ms};

pub const ADVANCE_STEP_DAYS: Ms = 7;
pub const ADVANCE_POINTS_PER_STEP: Ms = 5;
pub const MAX_ADVANCE_SCORE: u32 = 25;
pub const ATTENDANCE_DIVISOR: u32 = 10;
pub const MAX_ATTENDANCE_SCORE: u32 = 20;

/// Score difference above which a new request is strongly favored.
pub const STRONG_PREFERENCE_MARGIN: i64 = 30;

pub const MIN_TOTAL_SCORE: u32 = 10;
pub const MAX_TOTAL_SCORE: u32 = 145;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub category_score: u32,
    pub advance_score: u32,
    pub attendance_score: u32,
    pub total: u32,
}

pub fn category_score(category: Category) -> u32 {
    match category {
        Category::Institutional => 100,
        Category::Departmental => 50,
        Category::Student => 20,
        Category::Other => 10,
    }
}

/// Five points per full week of lead time, capped at 25.
pub fn advance_score(submitted_at: Ms, window_start: Ms) -> u32 {
    let lead_days = (window_start - submitted_at).div_euclid(DAY_MS);
    let points = lead_days.div_euclid(ADVANCE_STEP_DAYS) * ADVANCE_POINTS_PER_STEP;
    points.clamp(0, MAX_ADVANCE_SCORE as Ms) as u32
}

pub fn attendance_score(expected_attendance: u32) -> u32 {
    (expected_attendance / ATTENDANCE_DIVISOR).min(MAX_ATTENDANCE_SCORE)
}

pub fn score(
    category: Category,
    submitted_at: Ms,
    window_start: Ms,
    expected_attendance: u32,
) -> ScoreBreakdown {
    let category_score = category_score(category);
    let advance_score = advance_score(submitted_at, window_start);
    let attendance_score = attendance_score(expected_attendance);
    ScoreBreakdown {
        category_score,
        advance_score,
        attendance_score,
        total: category_score + advance_score + attendance_score,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    StronglyFavorNew,
    FavorNewNeedsReview,
    FavorExisting,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StronglyFavorNew => "strongly favor new",
            Recommendation::FavorNewNeedsReview => "favor new, needs review",
            Recommendation::FavorExisting => "favor existing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityAnalysis {
    pub new_score: u32,
    pub existing_score: u32,
    /// `new_score - existing_score`.
    pub difference: i64,
    pub recommendation: Recommendation,
    pub can_override: bool,
}

pub fn compare(new_score: u32, existing_score: u32) -> PriorityAnalysis {
    let difference = new_score as i64 - existing_score as i64;
    let recommendation = if difference > STRONG_PREFERENCE_MARGIN {
        Recommendation::StronglyFavorNew
    } else if difference > 0 {
        Recommendation::FavorNewNeedsReview
    } else {
        Recommendation::FavorExisting
    };
    PriorityAnalysis {
        new_score,
        existing_score,
        difference,
        recommendation,
        can_override: difference > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const NOW: Ms = 1_700_000_000_000;

    #[test]
    fn student_ten_days_ahead() {
        let s = score(Category::Student, NOW, NOW + 10 * DAY_MS, 50);
        assert_eq!(s.category_score, 20);
        assert_eq!(s.advance_score, 5);
        assert_eq!(s.attendance_score, 5);
        assert_eq!(s.total, 30);
    }

    #[test]
    fn institutional_same_day() {
        let s = score(Category::Institutional, NOW, NOW + 3 * 3_600_000, 200);
        assert_eq!(s.advance_score, 0);
        assert_eq!(s.attendance_score, 20);
        assert_eq!(s.total, 120);
    }

    #[test]
    fn advance_steps_and_cap() {
        assert_eq!(advance_score(NOW, NOW + 6 * DAY_MS), 0);
        assert_eq!(advance_score(NOW, NOW + 7 * DAY_MS), 5);
        assert_eq!(advance_score(NOW, NOW + 14 * DAY_MS - 1), 5);
        assert_eq!(advance_score(NOW, NOW + 35 * DAY_MS), 25);
        assert_eq!(advance_score(NOW, NOW + 400 * DAY_MS), 25);
        assert_eq!(advance_score(NOW, NOW - DAY_MS), 0);
    }

    #[test]
    fn attendance_cap() {
        assert_eq!(attendance_score(9), 0);
        assert_eq!(attendance_score(199), 19);
        assert_eq!(attendance_score(5_000), 20);
    }

    #[test]
    fn comparison_bands() {
        assert_eq!(compare(120, 30).recommendation, Recommendation::StronglyFavorNew);
        assert_eq!(compare(60, 30).recommendation, Recommendation::FavorNewNeedsReview);
        assert_eq!(compare(31, 30).recommendation, Recommendation::FavorNewNeedsReview);
        assert_eq!(compare(30, 30).recommendation, Recommendation::FavorExisting);
        assert_eq!(compare(10, 30).recommendation, Recommendation::FavorExisting);
        assert!(!compare(30, 30).can_override);
        assert_eq!(compare(120, 30).difference, 90);
    }

    #[test]
    fn category_scores_strictly_ordered() {
        let scores: Vec<u32> = Category::ALL.into_iter().map(category_score).collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
    }

    fn any_category() -> impl Strategy<Value = Category> {
        prop_oneof![
            Just(Category::Institutional),
            Just(Category::Departmental),
            Just(Category::Student),
            Just(Category::Other),
        ]
    }

    proptest! {
        #[test]
        fn total_is_bounded_and_deterministic(
            category in any_category(),
            submitted_at in 0..4_000_000_000_000i64,
            lead in -400 * DAY_MS..400 * DAY_MS,
            attendance in any::<u32>(),
        ) {
            let a = score(category, submitted_at, submitted_at + lead, attendance);
            let b = score(category, submitted_at, submitted_at + lead, attendance);
            prop_assert_eq!(a, b);
            prop_assert!(a.total >= MIN_TOTAL_SCORE && a.total <= MAX_TOTAL_SCORE);
            prop_assert_eq!(a.total, a.category_score + a.advance_score + a.attendance_score);
        }

        #[test]
        fn higher_category_never_scores_lower(
            submitted_at in 0..4_000_000_000_000i64,
            lead in 0..400 * DAY_MS,
            attendance in 0..5_000u32,
        ) {
            let totals: Vec<u32> = Category::ALL
                .into_iter()
                .map(|c| score(c, submitted_at, submitted_at + lead, attendance).total)
                .collect();
            prop_assert!(totals.windows(2).all(|w| w[0] > w[1]));
        }
    }
}
