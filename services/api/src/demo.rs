use crate::infra::seeded_store;
use clap::Args;
use shiftwise::error::AppError;
use shiftwise::store::InMemoryStore;
use shiftwise::workflows::scheduling::{
    ClassroomChangeSubmission, ClassroomId, ConflictDiffPolicy, Decision, EffectStatus, Identity,
    RequestId, RoomCheck, SchedulingEngine, ShiftId, StudentId, TeacherId,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Conflict diff policy to demonstrate (identity or signature).
    #[arg(long, value_parser = crate::infra::parse_diff_policy)]
    pub(crate) conflict_diff: Option<ConflictDiffPolicy>,
    /// Skip the change request and publication portion of the demo.
    #[arg(long)]
    pub(crate) skip_requests: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        conflict_diff,
        skip_requests,
    } = args;

    let policy = conflict_diff.unwrap_or_default();
    let store = seeded_store().await;
    let engine = SchedulingEngine::new(store, policy);

    println!("Shift scheduling demo");

    println!("\nCampus snapshot");
    let shifts = match engine.catalog.enriched_shifts().await {
        Ok(shifts) => shifts,
        Err(err) => {
            println!("  Shift listing unavailable: {}", err);
            return Ok(());
        }
    };
    for shift in &shifts {
        println!(
            "- {} {} | {} | {} {}:00-{}:00 | {}/{} ({})",
            shift.course_abbreviation,
            shift.shift.name.as_deref().unwrap_or("-"),
            shift.kind,
            shift.shift.day,
            shift.shift.from,
            shift.shift.to,
            shift.current,
            shift.capacity,
            shift.status.label()
        );
    }

    println!("\nSeat allocation (lab SA PL2, capacity 3)");
    let target = ShiftId("sa-pl2".to_string());
    allocate_step(&engine, "a103", &target).await;
    println!("  Asking again returns the seat already held:");
    allocate_step(&engine, "a103", &target).await;
    allocate_step(&engine, "a106", &target).await;
    println!("  A student switching labs releases the old seat:");
    allocate_step(&engine, "a101", &target).await;
    print_counter(&engine, "sa-pl1").await;
    print_counter(&engine, "sa-pl2").await;
    println!("  A full lab refuses ordinary students but not special status:");
    allocate_step(&engine, "a104", &target).await;
    allocate_step(&engine, "a102", &target).await;
    print_counter(&engine, "sa-pl2").await;
    println!("  Removal is idempotent:");
    for _ in 0..2 {
        match engine
            .allocator
            .remove(&target, &StudentId("a102".to_string()), None)
            .await
        {
            Ok(outcome) => println!("  - a102 removal outcome: {}", outcome.label()),
            Err(err) => println!("  - a102 removal failed: {}", err),
        }
    }

    println!("\nRoom availability (Auditorium A, Monday)");
    for (from, to) in [(9u8, 11u8), (11u8, 13u8)] {
        let check = engine
            .conflicts
            .check_room(&ClassroomId("r3".to_string()), "Monday", from, to)
            .await;
        match &check {
            RoomCheck::Free => println!("  - {}:00-{}:00: free", from, to),
            RoomCheck::Occupied { clash } => println!(
                "  - {}:00-{}:00: occupied by {} {} ({} {}:00-{}:00)",
                from,
                to,
                clash.course_name,
                clash.shift_name.as_deref().unwrap_or("?"),
                clash.day,
                clash.from,
                clash.to
            ),
            RoomCheck::AwaitingDecision { request_id } => println!(
                "  - {}:00-{}:00: blocked by undecided classroom request {}",
                from, to, request_id
            ),
            RoomCheck::Indeterminate { detail } => {
                println!("  - {}:00-{}:00: unknown ({})", from, to, detail)
            }
        }
    }

    println!("\nConflict diff for a101 against an empty snapshot ({:?})", policy);
    match engine
        .conflicts
        .diff_conflicts(&StudentId("a101".to_string()), &[])
        .await
    {
        Ok(diff) => {
            for view in &diff.created {
                println!(
                    "  - new: {} ({})",
                    view.conflict.id,
                    view.course_names.join(" / ")
                );
            }
            for view in &diff.resolved {
                println!(
                    "  - resolved: {} ({})",
                    view.conflict.id,
                    view.course_names.join(" / ")
                );
            }
            if !diff.has_changes() {
                println!("  - no changes");
            }
        }
        Err(err) => println!("  Conflict lookup unavailable: {}", err),
    }

    if skip_requests {
        return Ok(());
    }

    println!("\nDirector request queue");
    let overview = match engine.requests.overview(&Identity::Director).await {
        Ok(overview) => overview,
        Err(err) => {
            println!("  Overview unavailable: {}", err);
            return Ok(());
        }
    };
    for summary in &overview {
        println!(
            "  - request {} ({:?}) from {} on {}: {}",
            summary.id,
            summary.kind,
            summary.requester,
            summary.shift_label,
            summary.state.label()
        );
    }

    let request_id = RequestId("1".to_string());
    match engine
        .requests
        .decide_shift_request(&request_id, Decision::Approved)
        .await
    {
        Ok(outcome) => match outcome.effect {
            EffectStatus::Applied => println!("  Request 1 approved; seat moved"),
            EffectStatus::Pending { detail } => {
                println!("  Request 1 approved; effect pending ({})", detail)
            }
            EffectStatus::NotRequired => println!("  Request 1 approved; nothing to apply"),
        },
        Err(err) => {
            println!("  Decision failed: {}", err);
            return Ok(());
        }
    }
    match engine.requests.pending_effects().await {
        Ok(pending) => println!(
            "  Pending effects: {} shift, {} classroom",
            pending.shift_requests.len(),
            pending.classroom_requests.len()
        ),
        Err(err) => println!("  Pending effect listing unavailable: {}", err),
    }
    match engine
        .allocator
        .remove(&target, &StudentId("a101".to_string()), None)
        .await
    {
        Ok(outcome) => println!("  a101 frees a seat in sa-pl2: {}", outcome.label()),
        Err(err) => println!("  Removal failed: {}", err),
    }
    match engine.requests.retry_shift_effect(&request_id).await {
        Ok(outcome) => match outcome.effect {
            EffectStatus::Applied => println!("  Retry succeeded; a104 now sits in sa-pl2"),
            EffectStatus::Pending { detail } => println!("  Retry still pending ({})", detail),
            EffectStatus::NotRequired => println!("  Retry had nothing to apply"),
        },
        Err(err) => println!("  Retry failed: {}", err),
    }

    println!("\nClassroom change (DS PL1 into Lab 1.01)");
    let submission = ClassroomChangeSubmission {
        teacher_id: TeacherId("t2".to_string()),
        classroom_id: ClassroomId("r1".to_string()),
        shift_id: ShiftId("ds-pl1".to_string()),
        reason: Some("bench equipment only in Lab 1.01".to_string()),
    };
    let filed = match engine.requests.submit_classroom_change(submission).await {
        Ok(request) => request,
        Err(err) => {
            println!("  Submission failed: {}", err);
            return Ok(());
        }
    };
    println!("  Filed classroom request {}", filed.id);
    match engine
        .requests
        .decide_classroom_request(&filed.id, Decision::Approved)
        .await
    {
        Ok(outcome) => match outcome.effect {
            EffectStatus::Applied => println!("  Approved; the shift now meets in Lab 1.01"),
            EffectStatus::Pending { detail } => println!("  Approved; move pending ({})", detail),
            EffectStatus::NotRequired => println!("  Approved; nothing to apply"),
        },
        Err(err) => println!("  Decision failed: {}", err),
    }

    println!("\nSchedule publication");
    match engine.notifications.publish_schedules().await {
        Ok(summary) => println!(
            "  Notified {} students ({} failures)",
            summary.notified, summary.failed
        ),
        Err(err) => println!("  Publication failed: {}", err),
    }

    let student = Identity::Student(StudentId("a104".to_string()));
    match engine.notifications.feed(&student).await {
        Ok(feed) => {
            println!("  Feed for a104:");
            for entry in &feed {
                println!("    - [{}] {}: {}", entry.id, entry.title, entry.message);
            }
            if let Some(first) = feed.first() {
                match engine.notifications.mark_read(&student, &first.id).await {
                    Ok(()) => println!("  Marked {} as read", first.id),
                    Err(err) => println!("  Mark read failed: {}", err),
                }
            }
        }
        Err(err) => println!("  Feed unavailable: {}", err),
    }

    match engine.notifications.feed(&Identity::Director).await {
        Ok(feed) => {
            println!("  Director feed:");
            for entry in &feed {
                println!("    - [{}] {}", entry.id, entry.title);
            }
        }
        Err(err) => println!("  Feed unavailable: {}", err),
    }

    Ok(())
}

async fn allocate_step(engine: &SchedulingEngine<InMemoryStore>, student: &str, shift: &ShiftId) {
    match engine
        .allocator
        .allocate(&StudentId(student.to_string()), shift)
        .await
    {
        Ok(allocation) => println!(
            "  - {} -> {}: seat {}",
            student, allocation.shift_id, allocation.id
        ),
        Err(err) => println!("  - {} refused: {}", student, err),
    }
}

async fn print_counter(engine: &SchedulingEngine<InMemoryStore>, shift: &str) {
    match engine
        .catalog
        .enriched_shift(&ShiftId(shift.to_string()))
        .await
    {
        Ok(enriched) => println!(
            "  {} now {}/{} ({})",
            shift,
            enriched.current,
            enriched.capacity,
            enriched.status.label()
        ),
        Err(err) => println!("  {} lookup unavailable: {}", shift, err),
    }
}
