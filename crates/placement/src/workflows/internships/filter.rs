use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::{Posting, PostingLevel, PostingStatus, StudentProfile};

/// Optional constraints narrowing a posting listing. Blank strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub status: Option<PostingStatus>,
    #[serde(default)]
    pub level: Option<PostingLevel>,
    #[serde(default)]
    pub major: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub levels: BTreeSet<PostingLevel>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl FilterConfig {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.level.is_none()
            && present(&self.major).is_none()
            && present(&self.company).is_none()
            && present(&self.keyword).is_none()
            && self.levels.is_empty()
    }
}

/// Stateless predicate over postings.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilterEngine;

impl FilterEngine {
    pub fn matches(&self, posting: &Posting, filter: &FilterConfig) -> bool {
        if let Some(status) = filter.status {
            if posting.status != status {
                return false;
            }
        }

        if let Some(level) = filter.level {
            if posting.level != level {
                return false;
            }
        }

        if let Some(major) = present(&filter.major) {
            let matches_major = posting
                .preferred_major()
                .map(|preferred| preferred.eq_ignore_ascii_case(major))
                .unwrap_or(false);
            if !matches_major {
                return false;
            }
        }

        if let Some(company) = present(&filter.company) {
            if !posting.company_name.trim().eq_ignore_ascii_case(company) {
                return false;
            }
        }

        if let Some(keyword) = present(&filter.keyword) {
            if !posting.mentions(keyword) {
                return false;
            }
        }

        filter.levels.is_empty() || filter.levels.contains(&posting.level)
    }

    /// Keep the postings matching `filter`, preserving their order.
    pub fn apply(&self, postings: Vec<Posting>, filter: &FilterConfig) -> Vec<Posting> {
        if filter.is_empty() {
            return postings;
        }

        postings
            .into_iter()
            .filter(|posting| self.matches(posting, filter))
            .collect()
    }
}

/// Hard criteria a student always wants enforced. They never change a score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonNegotiables {
    #[serde(default)]
    pub must_match_major: bool,
    #[serde(default = "default_only_open_now")]
    pub only_open_now: bool,
    #[serde(default)]
    pub title_keywords: Vec<String>,
}

fn default_only_open_now() -> bool {
    true
}

impl Default for NonNegotiables {
    fn default() -> Self {
        Self {
            must_match_major: false,
            only_open_now: default_only_open_now(),
            title_keywords: Vec::new(),
        }
    }
}

impl NonNegotiables {
    pub fn add_keyword(&mut self, keyword: &str) {
        let keyword = keyword.trim();
        if !keyword.is_empty() {
            self.title_keywords.push(keyword.to_string());
        }
    }

    /// `only_open_now` is honoured upstream by the listing window check.
    pub fn admits(&self, posting: &Posting, student: &StudentProfile) -> bool {
        if self.must_match_major && !posting.welcomes_major(&student.major) {
            return false;
        }

        let title = posting.title.to_lowercase();
        self.title_keywords
            .iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .all(|keyword| title.contains(&keyword))
    }
}
