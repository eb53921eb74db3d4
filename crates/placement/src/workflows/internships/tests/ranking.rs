use super::common::*;
use crate::workflows::internships::domain::{Posting, PostingLevel};
use crate::workflows::internships::ranking::{RankingEngine, RankingWeights, ScoreFactor};

fn closing_in(id: &str, days: Option<i64>) -> Posting {
    let mut posting = posting(id, 2);
    posting.close_date = days.map(days_from_today);
    posting
}

fn closing_points(posting: &Posting, weights: &RankingWeights) -> u32 {
    RankingEngine::new()
        .breakdown(posting, &student("U1", 3, "CSC"), weights, today())
        .into_iter()
        .find(|component| component.factor == ScoreFactor::ClosingSoon)
        .map(|component| component.score)
        .expect("closing-soon term present")
}

#[test]
fn closing_soon_term_tapers_over_thirty_days() {
    let weights = RankingWeights::default();

    assert_eq!(closing_points(&closing_in("A", Some(0)), &weights), 30);
    assert_eq!(closing_points(&closing_in("B", Some(15)), &weights), 15);
    assert_eq!(closing_points(&closing_in("C", Some(30)), &weights), 0);
    assert_eq!(closing_points(&closing_in("D", Some(45)), &weights), 0);
    assert_eq!(closing_points(&closing_in("E", Some(-1)), &weights), 0);
    assert_eq!(closing_points(&closing_in("F", None), &weights), 0);

    let odd = RankingWeights {
        closing_soon: 25,
        ..RankingWeights::default()
    };
    assert_eq!(closing_points(&closing_in("G", Some(15)), &odd), 13);
}

#[test]
fn breakdown_reports_each_term_in_order() {
    let posting = closing_in("INT-0001", Some(0));
    let weights = RankingWeights::default().with_keyword("tooling");

    let components = RankingEngine::new().breakdown(
        &posting,
        &student("U1", 3, "CSC"),
        &weights,
        today(),
    );

    let factors: Vec<ScoreFactor> = components.iter().map(|c| c.factor).collect();
    assert_eq!(
        factors,
        vec![
            ScoreFactor::Major,
            ScoreFactor::ClosingSoon,
            ScoreFactor::LevelFit,
            ScoreFactor::Keyword,
        ]
    );
    let scores: Vec<u32> = components.iter().map(|c| c.score).collect();
    assert_eq!(scores, vec![30, 30, 20, 20]);
    assert_eq!(
        RankingEngine::new().score(&posting, &student("U1", 3, "CSC"), &weights, today()),
        100
    );
}

#[test]
fn unmatched_preferences_earn_nothing() {
    let mut posting = closing_in("INT-0001", None);
    posting.preferred_major = Some("EEE".to_string());
    let weights = RankingWeights::default()
        .with_keyword("blockchain")
        .with_levels([PostingLevel::Advanced]);

    let score = RankingEngine::new().score(&posting, &student("U1", 3, "CSC"), &weights, today());

    assert_eq!(score, 0);
}

#[test]
fn blank_ranking_keyword_is_ignored() {
    let posting = closing_in("INT-0001", None);
    let weights = RankingWeights::default().with_keyword("   ");

    let score = RankingEngine::new().score(&posting, &student("U1", 3, "CSC"), &weights, today());

    assert_eq!(score, 30 + 20);
}

#[test]
fn rank_orders_by_score_and_keeps_ties_in_input_order() {
    let postings = vec![
        closing_in("tie-a", None),
        closing_in("soonest", Some(0)),
        closing_in("tie-b", None),
        closing_in("later", Some(15)),
        closing_in("tie-c", None),
    ];

    let ranked = RankingEngine::new().rank(
        postings,
        &student("U1", 3, "CSC"),
        &RankingWeights::default(),
        today(),
    );

    let order: Vec<(&str, u32)> = ranked
        .iter()
        .map(|entry| (entry.posting.id.as_str(), entry.score))
        .collect();
    assert_eq!(
        order,
        vec![
            ("soonest", 80),
            ("later", 65),
            ("tie-a", 50),
            ("tie-b", 50),
            ("tie-c", 50),
        ]
    );
}

#[test]
fn scoring_is_repeatable_and_leaves_inputs_alone() {
    let postings: Vec<Posting> = (0..6)
        .map(|n| closing_in(&format!("P{n}"), Some(n * 7)))
        .collect();
    let snapshot = postings.clone();
    let engine = RankingEngine::new();
    let weights = RankingWeights::default().with_keyword("intern");
    let u1 = student("U1", 3, "CSC");

    let first = engine.rank(postings.clone(), &u1, &weights, today());
    let second = engine.rank(postings.clone(), &u1, &weights, today());

    assert_eq!(first, second);
    assert_eq!(postings, snapshot);
    for posting in &postings {
        assert_eq!(
            engine.score(posting, &u1, &weights, today()),
            engine.score(posting, &u1, &weights, today())
        );
    }
}

#[test]
fn unranked_listing_scores_zero_in_catalog_order() {
    let postings = vec![
        closing_in("late", Some(20)),
        closing_in("soon", Some(0)),
    ];

    let listed = RankingEngine::new().unranked(postings);

    assert_eq!(listed[0].posting.id.as_str(), "late");
    assert_eq!(listed[1].posting.id.as_str(), "soon");
    assert!(listed.iter().all(|entry| entry.score == 0));
}

#[test]
fn extreme_weights_saturate_instead_of_overflowing() {
    let posting = closing_in("INT-0001", Some(0));
    let weights = RankingWeights {
        major: u32::MAX,
        closing_soon: u32::MAX,
        level_fit: 1,
        ..RankingWeights::default()
    };
    let engine = RankingEngine::new();
    let u1 = student("U1", 3, "CSC");

    assert_eq!(engine.score(&posting, &u1, &weights, today()), u32::MAX);

    let mut modest = closing_in("INT-0002", None);
    modest.preferred_major = Some("EEE".to_string());
    let ranked = engine.rank(vec![modest, posting], &u1, &weights, today());
    assert_eq!(ranked[0].posting.id.as_str(), "INT-0001");
    assert_eq!(ranked[0].score, u32::MAX);
    assert_eq!(ranked[1].score, 1);
}
