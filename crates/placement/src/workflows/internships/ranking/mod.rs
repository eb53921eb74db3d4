mod config;
mod rules;

pub use config::RankingWeights;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Posting, StudentProfile};

/// Stateless scorer ordering postings by preference fit.
#[derive(Debug, Default, Clone, Copy)]
pub struct RankingEngine;

impl RankingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Per-term contributions, in the order major, closing-soon, level-fit, keyword.
    pub fn breakdown(
        &self,
        posting: &Posting,
        student: &StudentProfile,
        weights: &RankingWeights,
        today: NaiveDate,
    ) -> Vec<ScoreComponent> {
        rules::score_terms(posting, student, weights, today)
    }

    /// Sum of the breakdown. Saturates at `u32::MAX` rather than wrapping.
    pub fn score(
        &self,
        posting: &Posting,
        student: &StudentProfile,
        weights: &RankingWeights,
        today: NaiveDate,
    ) -> u32 {
        self.breakdown(posting, student, weights, today)
            .iter()
            .fold(0u32, |total, component| total.saturating_add(component.score))
    }

    /// Score every posting and sort descending. Ties keep their input order.
    pub fn rank(
        &self,
        postings: Vec<Posting>,
        student: &StudentProfile,
        weights: &RankingWeights,
        today: NaiveDate,
    ) -> Vec<ScoredPosting> {
        let mut scored: Vec<ScoredPosting> = postings
            .into_iter()
            .map(|posting| {
                let score = self.score(&posting, student, weights, today);
                ScoredPosting { posting, score }
            })
            .collect();

        // `sort_by` is stable, which the tie rule relies on.
        scored.sort_by(|a, b| b.score.cmp(&a.score));
        scored
    }

    /// Listing used when recommendations are switched off: every score is zero.
    pub fn unranked(&self, postings: Vec<Posting>) -> Vec<ScoredPosting> {
        postings
            .into_iter()
            .map(|posting| ScoredPosting { posting, score: 0 })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreFactor {
    Major,
    ClosingSoon,
    LevelFit,
    Keyword,
}

/// Discrete contribution to a posting's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub factor: ScoreFactor,
    pub score: u32,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredPosting {
    pub posting: Posting,
    pub score: u32,
}
