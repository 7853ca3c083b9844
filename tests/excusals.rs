mod common;

use muster::db::{Change, Store};
use muster::error::MusterError;
use muster::models::cadet::{Cadet, CadetStatus};
use muster::models::event::attendance::{AttendanceRow, AttendanceStatus};
use muster::models::event::attendance_override::AttendanceOverride;
use muster::models::event::excusal::{Excusal, ExcusalForm, ExcusalStatus, ExcusalUpdate};

use crate::common::{excusal_form, harness, FailingCommit};

#[tokio::test]
async fn excusal_lifecycle_drives_attendance() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    let ftx = harness.add_event("2025 FTX", "2025-10-01").await;

    let excusal = harness.submit("jane doe", "2025 FTX", "2025-09-30").await;
    assert_eq!(excusal.status, ExcusalStatus::Pending);
    assert_eq!(excusal.cadet_id, Some(jane.id));
    assert_eq!(
        Cadet::with_id(jane.id, &harness.store).await.unwrap().status,
        CadetStatus::Pending
    );
    let row = AttendanceRow::for_cadet_at_event(jane.id, ftx.id, &harness.store)
        .await
        .unwrap();
    assert_eq!(row.status, AttendanceStatus::Pending);

    let approved = Excusal::approve(excusal.id, &harness.staff, &harness.store)
        .await
        .unwrap();
    assert_eq!(approved.status, ExcusalStatus::Approved);
    assert_eq!(
        Cadet::with_id(jane.id, &harness.store).await.unwrap().status,
        CadetStatus::Excused
    );
    let row = AttendanceRow::for_cadet_at_event(jane.id, ftx.id, &harness.store)
        .await
        .unwrap();
    assert_eq!(row.status, AttendanceStatus::Excused);
    assert_eq!(row.excusal.map(|e| e.id), Some(excusal.id));

    AttendanceOverride::set(jane.id, ftx.id, "present", &harness.staff, &harness.store)
        .await
        .unwrap();
    let row = AttendanceRow::for_cadet_at_event(jane.id, ftx.id, &harness.store)
        .await
        .unwrap();
    assert_eq!(row.status, AttendanceStatus::Present);
    assert!(row.overridden);
}

#[tokio::test]
async fn decided_excusals_must_be_reopened() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    let excusal = harness.submit("Jane Doe", "llab", "2025-09-17").await;

    Excusal::approve(excusal.id, &harness.staff, &harness.store)
        .await
        .unwrap();

    let deny = Excusal::deny(excusal.id, &harness.staff, &harness.store).await;
    assert!(matches!(
        deny,
        Err(MusterError::InvalidTransition {
            from: ExcusalStatus::Approved,
            to: ExcusalStatus::Denied,
            ..
        })
    ));
    let edit = Excusal::update(
        excusal.id,
        ExcusalUpdate {
            reason: Some("Changed my mind".to_owned()),
            ..Default::default()
        },
        &harness.store,
    )
    .await;
    assert!(matches!(edit, Err(MusterError::InvalidTransition { .. })));

    let reopened = Excusal::reopen(excusal.id, &harness.staff, &harness.store)
        .await
        .unwrap();
    assert_eq!(reopened.status, ExcusalStatus::Pending);
    assert_eq!(
        Cadet::with_id(jane.id, &harness.store).await.unwrap().status,
        CadetStatus::Pending
    );

    let reopen_again = Excusal::reopen(excusal.id, &harness.staff, &harness.store).await;
    assert!(matches!(reopen_again, Err(MusterError::InvalidTransition { .. })));

    let denied = Excusal::deny(excusal.id, &harness.staff, &harness.store)
        .await
        .unwrap();
    assert_eq!(denied.status, ExcusalStatus::Denied);
    assert_eq!(
        Cadet::with_id(jane.id, &harness.store).await.unwrap().status,
        CadetStatus::Present
    );
}

#[tokio::test]
async fn pending_excusals_can_be_edited() {
    let harness = harness().await;
    harness.add_cadet("Jane Doe").await;
    let excusal = harness.submit("Jane Doe", "llab", "2025-09-17").await;

    let edited = Excusal::update(
        excusal.id,
        ExcusalUpdate {
            event: Some("class".to_owned()),
            reason: Some("   ".to_owned()),
            ..Default::default()
        },
        &harness.store,
    )
    .await
    .unwrap();

    assert_eq!(edited.event, "class");
    assert_eq!(edited.reason, "Medical appointment");
    assert_eq!(edited.status, ExcusalStatus::Pending);

    let bad_date = Excusal::update(
        excusal.id,
        ExcusalUpdate {
            date: Some("09/17/2025".to_owned()),
            ..Default::default()
        },
        &harness.store,
    )
    .await;
    assert!(matches!(bad_date, Err(MusterError::InvalidDate(_))));
}

#[tokio::test]
async fn submissions_need_a_rostered_cadet_and_a_real_date() {
    let harness = harness().await;
    harness.add_cadet("Jane Doe").await;

    let stranger = Excusal::submit(excusal_form("John Roe", "llab", "2025-09-17"), &harness.store).await;
    assert!(matches!(stranger, Err(MusterError::CadetNotFound(_))));

    let bad_date = Excusal::submit(excusal_form("Jane Doe", "llab", "2025-02-30"), &harness.store).await;
    assert!(matches!(bad_date, Err(MusterError::InvalidDate(_))));

    let undated = Excusal::submit(
        ExcusalForm {
            date: None,
            ..excusal_form("Jane Doe", "llab", "")
        },
        &harness.store,
    )
    .await
    .unwrap();
    assert_eq!(undated.date, muster::util::today().unwrap());

    assert_eq!(Excusal::all(&harness.store).await.unwrap().len(), 1);
}

#[tokio::test]
async fn bulk_approval_only_touches_the_event() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    let john = harness.add_cadet("John Roe").await;
    let ftx = harness.add_event("2025 FTX", "2025-10-01").await;

    let first = harness.submit("Jane Doe", "2025 FTX", "2025-09-29").await;
    let second = harness.submit("John Roe", "2025 FTX", "2025-09-30").await;
    let elsewhere = harness.submit("John Roe", "llab", "2025-09-30").await;
    let denied = harness.submit("Jane Doe", "2025 FTX", "2025-09-28").await;
    Excusal::deny(denied.id, &harness.staff, &harness.store)
        .await
        .unwrap();

    let approved = Excusal::approve_all_for_event(ftx.id, &harness.staff, &harness.store)
        .await
        .unwrap();

    let ids = approved.iter().map(|e| e.id).collect::<Vec<_>>();
    assert_eq!(ids, vec![first.id, second.id]);
    for id in [first.id, second.id] {
        let excusal = Excusal::with_id(id, &harness.store).await.unwrap();
        assert_eq!(excusal.status, ExcusalStatus::Approved);
    }
    assert_eq!(
        Excusal::with_id(elsewhere.id, &harness.store).await.unwrap().status,
        ExcusalStatus::Pending
    );
    assert_eq!(
        Excusal::with_id(denied.id, &harness.store).await.unwrap().status,
        ExcusalStatus::Denied
    );
    for id in [jane.id, john.id] {
        let cadet = Cadet::with_id(id, &harness.store).await.unwrap();
        assert_eq!(cadet.status, CadetStatus::Excused);
    }

    let unknown = Excusal::approve_all_for_event(ftx.id + 100, &harness.staff, &harness.store).await;
    assert!(matches!(unknown, Err(MusterError::EventNotFound(_))));
}

#[tokio::test]
async fn a_failed_batch_commits_nothing() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    let first = harness.submit("Jane Doe", "2025 FTX", "2025-09-29").await;
    let second = harness.submit("Jane Doe", "2025 FTX", "2025-09-30").await;
    Excusal::approve(second.id, &harness.staff, &harness.store)
        .await
        .unwrap();

    let result = harness
        .store
        .commit(&[
            Change::ExcusalStatus {
                id: first.id,
                from: ExcusalStatus::Pending,
                to: ExcusalStatus::Approved,
            },
            Change::CadetStatus {
                id: jane.id,
                status: CadetStatus::Present,
            },
            Change::ExcusalStatus {
                id: second.id,
                from: ExcusalStatus::Pending,
                to: ExcusalStatus::Approved,
            },
        ])
        .await;

    assert!(matches!(result, Err(MusterError::InvalidTransition { .. })));
    assert_eq!(
        Excusal::with_id(first.id, &harness.store).await.unwrap().status,
        ExcusalStatus::Pending
    );
    assert_eq!(
        Cadet::with_id(jane.id, &harness.store).await.unwrap().status,
        CadetStatus::Excused
    );
}

#[tokio::test]
async fn submission_stores_the_excusal_and_pending_status_together() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    let store = FailingCommit(&harness.store);

    let excusal = Excusal::submit(excusal_form("Jane Doe", "llab", "2025-09-17"), &store)
        .await
        .unwrap();

    assert_eq!(Excusal::all(&harness.store).await.unwrap(), vec![excusal]);
    assert_eq!(
        Cadet::with_id(jane.id, &harness.store).await.unwrap().status,
        CadetStatus::Pending
    );
}

#[tokio::test]
async fn bulk_approval_survives_a_removed_cadet() {
    let harness = harness().await;
    let amy = harness.add_cadet("Amy Brown").await;
    let jane = harness.add_cadet("Jane Doe").await;
    let john = harness.add_cadet("John Roe").await;
    let ftx = harness.add_event("2025 FTX", "2025-10-01").await;

    let submitted = vec![
        harness.submit("Amy Brown", "2025 FTX", "2025-09-28").await,
        harness.submit("Jane Doe", "2025 FTX", "2025-09-29").await,
        harness.submit("John Roe", "2025 FTX", "2025-09-30").await,
    ];
    Cadet::remove(jane.id, &harness.mirror, &harness.staff, &harness.store)
        .await
        .unwrap();

    let approved = Excusal::approve_all_for_event(ftx.id, &harness.staff, &harness.store)
        .await
        .unwrap();

    assert_eq!(approved.len(), 3);
    for excusal in &submitted {
        assert_eq!(
            Excusal::with_id(excusal.id, &harness.store).await.unwrap().status,
            ExcusalStatus::Approved
        );
    }
    for id in [amy.id, john.id] {
        assert_eq!(
            Cadet::with_id(id, &harness.store).await.unwrap().status,
            CadetStatus::Excused
        );
    }
    let remaining = Cadet::all(&harness.store).await.unwrap();
    assert!(remaining.iter().all(|cadet| cadet.id != jane.id));
}

#[tokio::test]
async fn a_failed_bulk_approval_approves_none() {
    let harness = harness().await;
    let amy = harness.add_cadet("Amy Brown").await;
    let jane = harness.add_cadet("Jane Doe").await;
    let john = harness.add_cadet("John Roe").await;
    let ftx = harness.add_event("2025 FTX", "2025-10-01").await;

    let submitted = vec![
        harness.submit("Amy Brown", "2025 FTX", "2025-09-28").await,
        harness.submit("Jane Doe", "2025 FTX", "2025-09-29").await,
        harness.submit("John Roe", "2025 FTX", "2025-09-30").await,
    ];
    Cadet::remove(jane.id, &harness.mirror, &harness.staff, &harness.store)
        .await
        .unwrap();

    let result =
        Excusal::approve_all_for_event(ftx.id, &harness.staff, &FailingCommit(&harness.store)).await;

    assert!(matches!(result, Err(MusterError::ServerError(_))));
    for excusal in &submitted {
        assert_eq!(
            Excusal::with_id(excusal.id, &harness.store).await.unwrap().status,
            ExcusalStatus::Pending
        );
    }
    for id in [amy.id, john.id] {
        assert_eq!(
            Cadet::with_id(id, &harness.store).await.unwrap().status,
            CadetStatus::Pending
        );
    }
}

#[tokio::test]
async fn pending_excusals_group_by_event() {
    let harness = harness().await;
    harness.add_cadet("Jane Doe").await;
    harness.add_cadet("John Roe").await;
    harness.submit("Jane Doe", "llab", "2025-09-17").await;
    harness.submit("John Roe", "2025 FTX", "2025-09-30").await;
    harness.submit("John Roe", "", "2025-09-30").await;
    let decided = harness.submit("Jane Doe", "2025 FTX", "2025-09-29").await;
    Excusal::approve(decided.id, &harness.staff, &harness.store)
        .await
        .unwrap();

    let groups = Excusal::pending_by_event(&harness.store).await.unwrap();
    let summary = groups
        .iter()
        .map(|group| (group.event.as_str(), group.excusals.len()))
        .collect::<Vec<_>>();

    assert_eq!(summary, vec![("2025 FTX", 1), ("Unspecified", 1), ("llab", 1)]);
    assert_eq!(Excusal::pending(&harness.store).await.unwrap().len(), 3);
}
