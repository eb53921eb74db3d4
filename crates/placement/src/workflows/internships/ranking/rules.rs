use chrono::NaiveDate;

use super::super::domain::{Posting, StudentProfile};
use super::config::RankingWeights;
use super::{ScoreComponent, ScoreFactor};

/// Days before the close date at which the closing-soon term starts counting.
pub(crate) const CLOSING_WINDOW_DAYS: i64 = 30;

pub(crate) fn score_terms(
    posting: &Posting,
    student: &StudentProfile,
    weights: &RankingWeights,
    today: NaiveDate,
) -> Vec<ScoreComponent> {
    vec![
        major_term(posting, student, weights),
        closing_soon_term(posting, weights, today),
        level_fit_term(posting, weights),
        keyword_term(posting, weights),
    ]
}

fn major_term(posting: &Posting, student: &StudentProfile, weights: &RankingWeights) -> ScoreComponent {
    if posting.welcomes_major(&student.major) {
        let notes = match posting.preferred_major() {
            Some(major) => format!("preferred major {major} matches"),
            None => "open to every major".to_string(),
        };
        ScoreComponent {
            factor: ScoreFactor::Major,
            score: weights.major,
            notes,
        }
    } else {
        ScoreComponent {
            factor: ScoreFactor::Major,
            score: 0,
            notes: format!(
                "prefers {}, student majors in {}",
                posting.preferred_major().unwrap_or_default(),
                student.major
            ),
        }
    }
}

fn closing_soon_term(posting: &Posting, weights: &RankingWeights, today: NaiveDate) -> ScoreComponent {
    let Some(close) = posting.close_date else {
        return ScoreComponent {
            factor: ScoreFactor::ClosingSoon,
            score: 0,
            notes: "no close date".to_string(),
        };
    };

    let days = (close - today).num_days();
    if days < 0 {
        return ScoreComponent {
            factor: ScoreFactor::ClosingSoon,
            score: 0,
            notes: format!("closed {} day(s) ago", -days),
        };
    }

    let score = closing_soon_points(weights.closing_soon, days);
    ScoreComponent {
        factor: ScoreFactor::ClosingSoon,
        score,
        notes: format!("closes in {days} day(s)"),
    }
}

/// Linear taper from the full weight on the close date down to zero at the window edge.
pub(crate) fn closing_soon_points(weight: u32, days: i64) -> u32 {
    if days < 0 || days >= CLOSING_WINDOW_DAYS {
        return 0;
    }
    let factor = (CLOSING_WINDOW_DAYS - days) as f64 / CLOSING_WINDOW_DAYS as f64;
    (weight as f64 * factor).round() as u32
}

fn level_fit_term(posting: &Posting, weights: &RankingWeights) -> ScoreComponent {
    if weights.ranking_levels.is_empty() || weights.ranking_levels.contains(&posting.level) {
        ScoreComponent {
            factor: ScoreFactor::LevelFit,
            score: weights.level_fit,
            notes: format!("{} level fits preferences", posting.level.label()),
        }
    } else {
        ScoreComponent {
            factor: ScoreFactor::LevelFit,
            score: 0,
            notes: format!("{} level outside preferences", posting.level.label()),
        }
    }
}

fn keyword_term(posting: &Posting, weights: &RankingWeights) -> ScoreComponent {
    match weights.ranking_keyword() {
        Some(keyword) if posting.mentions(keyword) => ScoreComponent {
            factor: ScoreFactor::Keyword,
            score: weights.keyword,
            notes: format!("mentions '{keyword}'"),
        },
        Some(keyword) => ScoreComponent {
            factor: ScoreFactor::Keyword,
            score: 0,
            notes: format!("does not mention '{keyword}'"),
        },
        None => ScoreComponent {
            factor: ScoreFactor::Keyword,
            score: 0,
            notes: "no ranking keyword".to_string(),
        },
    }
}
