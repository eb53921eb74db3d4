use crate::infra::{sample_directory, SAMPLE_PEER, SAMPLE_REP, SAMPLE_STUDENT};
use chrono::{Local, NaiveDate};
use clap::Args;
use placement::config::PlacementLimits;
use placement::error::AppError;
use placement::workflows::internships::{
    FixedClock, InMemoryNoticeBox, InMemoryPlacementStore, ListingRequest, PlacementContext,
    PlacementError, PlacementService, PostingId, RankingWeights, RepId, StudentId,
};
use std::sync::Arc;

type DemoService = PlacementService<InMemoryPlacementStore, InMemoryNoticeBox>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Pin the demo calendar (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Stop after the confirmation cascade.
    #[arg(long)]
    pub(crate) skip_waitlist: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let notices = Arc::new(InMemoryNoticeBox::default());
    let context = PlacementContext::new(
        Arc::new(sample_directory(today)),
        Arc::clone(&notices),
        Arc::new(FixedClock(today)),
        PlacementLimits::default(),
    );
    let service = PlacementService::new(context);

    let student = StudentId::new(SAMPLE_STUDENT);
    let peer = StudentId::new(SAMPLE_PEER);
    let rep = RepId::new(SAMPLE_REP);
    let backend = PostingId::new("INT-0001");
    let analyst = PostingId::new("INT-0002");

    print_listing(&service, &student, today)?;

    println!("\n== Applications ==");
    let first = service.apply(&student, &backend)?;
    let second = service.apply(&student, &analyst)?;
    println!("{student} applied: {} -> {backend}, {} -> {analyst}", first.id, second.id);

    let approved = service.approve(&rep, &first.id)?;
    println!("{rep} approved {} ({})", approved.id, approved.status);

    let outcome = service.confirm(&student, &first.id)?;
    println!(
        "{student} confirmed {}; {} now {} ({}/{} slots)",
        outcome.application.id,
        outcome.posting.id,
        outcome.posting.status.label(),
        outcome.posting.confirmed_count,
        outcome.posting.capacity
    );
    for withdrawn in &outcome.withdrawn_for_student {
        println!("  cascade withdrew {withdrawn} (student placed)");
    }
    for withdrawn in &outcome.withdrawn_for_posting {
        println!("  cascade withdrew {withdrawn} (posting filled)");
    }

    if args.skip_waitlist {
        return Ok(());
    }

    println!("\n== Waitlist ==");
    match service.apply(&peer, &backend) {
        Err(err @ PlacementError::CapacityExceeded { .. }) => {
            println!("{peer} could not apply: {err}");
        }
        Err(err) => return Err(err.into()),
        Ok(application) => println!("{peer} unexpectedly applied as {}", application.id),
    }

    let joined = service.join_waitlist(&peer, &backend)?;
    println!("{peer} joined the {backend} waitlist: {joined}");

    let requested = service.request_withdrawal(&student, &first.id)?;
    println!(
        "{student} requested withdrawal of {} (pending: {})",
        requested.id, requested.withdrawal_requested
    );

    let resolution = service.resolve_withdrawal(&first.id, true)?;
    println!(
        "withdrawal approved: {} is {}; slot released: {}; waitlist notified: {}",
        resolution.application.id,
        resolution.application.status,
        resolution.slot_released,
        resolution.notified
    );
    println!("{backend} has {} slot(s) open", service.remaining(&backend)?);

    println!("\n== Notices ==");
    for notice in notices.events() {
        println!("[{}] {}: {}", notice.template, notice.recipient, notice.message);
    }

    Ok(())
}

fn print_listing(
    service: &DemoService,
    student: &StudentId,
    today: NaiveDate,
) -> Result<(), AppError> {
    println!("== Recommended postings for {student} on {today} ==");
    let weights = RankingWeights::default().with_keyword("intern");
    let request = ListingRequest {
        weights: weights.clone(),
        ..ListingRequest::default()
    };

    for entry in service.list_ranked(student, &request)? {
        let posting = &entry.posting;
        println!(
            "{:>3}  {} {} ({}, {})",
            entry.score,
            posting.id,
            posting.title,
            posting.company_name,
            posting.level.label()
        );
        for component in service.explain(student, &posting.id, &weights)? {
            println!(
                "       {:?}: {} ({})",
                component.factor, component.score, component.notes
            );
        }
    }
    Ok(())
}
