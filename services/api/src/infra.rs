use chrono::{Duration, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use placement::workflows::internships::{
    InMemoryPlacementStore, Posting, PostingId, PostingLevel, PostingStatus, RepId,
    RepresentativeProfile, StaffId, StudentId, StudentProfile,
};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) const SAMPLE_STUDENT: &str = "S001";
pub(crate) const SAMPLE_JUNIOR: &str = "S002";
pub(crate) const SAMPLE_PEER: &str = "S003";
pub(crate) const SAMPLE_REP: &str = "rep-acme";
pub(crate) const SAMPLE_STAFF: &str = "staff-01";

fn student(id: &str, year: u8, major: &str) -> StudentProfile {
    StudentProfile {
        id: StudentId::new(id),
        year,
        major: major.to_string(),
    }
}

#[allow(clippy::too_many_arguments)]
fn posting(
    id: &str,
    title: &str,
    company: &str,
    owner: &str,
    level: PostingLevel,
    preferred_major: Option<&str>,
    capacity: u8,
    open_date: NaiveDate,
    close_date: Option<NaiveDate>,
    status: PostingStatus,
) -> Posting {
    Posting {
        id: PostingId::new(id),
        title: title.to_string(),
        description: format!("{title} at {company}"),
        level,
        preferred_major: preferred_major.map(str::to_string),
        company_name: company.to_string(),
        owner_rep_id: RepId::new(owner),
        capacity,
        confirmed_count: 0,
        visible: true,
        open_date,
        close_date,
        status,
    }
}

/// Sample accounts and postings around `today`, used by `serve` and `demo`.
pub(crate) fn sample_directory(today: NaiveDate) -> InMemoryPlacementStore {
    let opened = today - Duration::days(14);

    InMemoryPlacementStore::new()
        .with_student(student(SAMPLE_STUDENT, 3, "CSC"))
        .with_student(student(SAMPLE_JUNIOR, 1, "CSC"))
        .with_student(student(SAMPLE_PEER, 4, "CSC"))
        .with_student(student("S004", 3, "EEE"))
        .with_representative(RepresentativeProfile {
            id: RepId::new(SAMPLE_REP),
            company_name: "Acme Fintech".to_string(),
            approved: true,
        })
        .with_representative(RepresentativeProfile {
            id: RepId::new("rep-globex"),
            company_name: "Globex Labs".to_string(),
            approved: true,
        })
        .with_staff(StaffId::new(SAMPLE_STAFF))
        .with_posting(posting(
            "INT-0001",
            "Backend Intern",
            "Acme Fintech",
            SAMPLE_REP,
            PostingLevel::Basic,
            Some("CSC"),
            1,
            opened,
            Some(today + Duration::days(5)),
            PostingStatus::Approved,
        ))
        .with_posting(posting(
            "INT-0002",
            "Data Analyst Intern",
            "Acme Fintech",
            SAMPLE_REP,
            PostingLevel::Intermediate,
            None,
            2,
            opened,
            Some(today + Duration::days(20)),
            PostingStatus::Approved,
        ))
        .with_posting(posting(
            "INT-0003",
            "Embedded Systems Intern",
            "Globex Labs",
            "rep-globex",
            PostingLevel::Advanced,
            Some("EEE"),
            1,
            opened,
            None,
            PostingStatus::Approved,
        ))
        .with_posting(posting(
            "INT-0004",
            "Platform Intern",
            "Globex Labs",
            "rep-globex",
            PostingLevel::Basic,
            None,
            3,
            today,
            Some(today + Duration::days(45)),
            PostingStatus::Pending,
        ))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
