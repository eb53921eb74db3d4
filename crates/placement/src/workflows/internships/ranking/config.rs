use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::super::domain::PostingLevel;

/// Preference weights shaping the ranking. Each weight caps its term's contribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingWeights {
    #[serde(default = "default_major")]
    pub major: u32,
    #[serde(default = "default_closing_soon")]
    pub closing_soon: u32,
    #[serde(default = "default_level_fit")]
    pub level_fit: u32,
    #[serde(default = "default_keyword")]
    pub keyword: u32,
    /// Boosts postings mentioning this keyword; never filters.
    #[serde(default)]
    pub ranking_keyword: Option<String>,
    /// Levels earning the level-fit term; empty means every level fits.
    #[serde(default)]
    pub ranking_levels: BTreeSet<PostingLevel>,
}

fn default_major() -> u32 {
    30
}

fn default_closing_soon() -> u32 {
    30
}

fn default_level_fit() -> u32 {
    20
}

fn default_keyword() -> u32 {
    20
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            major: default_major(),
            closing_soon: default_closing_soon(),
            level_fit: default_level_fit(),
            keyword: default_keyword(),
            ranking_keyword: None,
            ranking_levels: BTreeSet::new(),
        }
    }
}

impl RankingWeights {
    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.ranking_keyword = Some(keyword.into());
        self
    }

    pub fn with_levels(mut self, levels: impl IntoIterator<Item = PostingLevel>) -> Self {
        self.ranking_levels = levels.into_iter().collect();
        self
    }

    pub fn ranking_keyword(&self) -> Option<&str> {
        self.ranking_keyword
            .as_deref()
            .map(str::trim)
            .filter(|keyword| !keyword.is_empty())
    }
}
