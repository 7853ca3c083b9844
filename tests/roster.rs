mod common;

use muster::db::Store;
use muster::error::MusterError;
use muster::mirror::RosterMirror;
use muster::models::cadet::{Cadet, CadetStatus, CadetUpdate, NewCadet};
use muster::models::event::attendance_override::AttendanceOverride;
use muster::models::event::excusal::Excusal;
use muster::util::normalize_name;

use crate::common::harness;

#[tokio::test]
async fn names_are_unique_ignoring_case() {
    let harness = harness().await;
    harness.add_cadet("Jane Doe").await;

    let result = Cadet::add(
        NewCadet {
            name: "  jane DOE ".to_owned(),
            rank: Some("C/2LT".to_owned()),
        },
        &harness.mirror,
        &harness.staff,
        &harness.store,
    )
    .await;

    assert!(matches!(result, Err(MusterError::DuplicateCadet(_))));
    assert_eq!(Cadet::all(&harness.store).await.unwrap().len(), 1);
}

#[tokio::test]
async fn new_cadets_start_present_and_land_in_the_mirror() {
    let harness = harness().await;
    let zed = harness.add_cadet("Zed Adams").await;
    harness.add_cadet("Amy Brown").await;

    assert_eq!(zed.status, CadetStatus::Present);
    assert_eq!(
        harness.mirror.read_names().unwrap(),
        vec!["Amy Brown".to_owned(), "Zed Adams".to_owned()]
    );

    let names = Cadet::all(&harness.store)
        .await
        .unwrap()
        .into_iter()
        .map(|cadet| cadet.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Amy Brown", "Zed Adams"]);
}

#[tokio::test]
async fn renaming_onto_another_cadet_is_rejected() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    harness.add_cadet("John Roe").await;

    let result = Cadet::update(
        jane.id,
        CadetUpdate {
            name: Some("JOHN ROE".to_owned()),
            rank: None,
        },
        &harness.mirror,
        &harness.staff,
        &harness.store,
    )
    .await;
    assert!(matches!(result, Err(MusterError::DuplicateCadet(_))));

    let renamed = Cadet::update(
        jane.id,
        CadetUpdate {
            name: Some("Jane Smith".to_owned()),
            rank: Some("C/CPT".to_owned()),
        },
        &harness.mirror,
        &harness.staff,
        &harness.store,
    )
    .await
    .unwrap();
    assert!(renamed.warning.is_none());
    assert_eq!(renamed.value.rank.as_deref(), Some("C/CPT"));
    assert_eq!(
        harness.mirror.read_names().unwrap(),
        vec!["Jane Smith".to_owned(), "John Roe".to_owned()]
    );
}

#[tokio::test]
async fn removing_a_cadet_drops_overrides_but_keeps_excusals() {
    let harness = harness().await;
    let jane = harness.add_cadet("Jane Doe").await;
    let ftx = harness.add_event("2025 FTX", "2025-10-01").await;
    let excusal = harness.submit("Jane Doe", "2025 FTX", "2025-09-30").await;
    AttendanceOverride::set(jane.id, ftx.id, "excused", &harness.staff, &harness.store)
        .await
        .unwrap();

    let removed = Cadet::remove(jane.id, &harness.mirror, &harness.staff, &harness.store)
        .await
        .unwrap();

    assert_eq!(removed.value.name, "Jane Doe");
    assert!(harness.mirror.read_names().unwrap().is_empty());
    assert!(AttendanceOverride::for_event(ftx.id, &harness.store)
        .await
        .unwrap()
        .is_empty());
    let kept = Excusal::with_id(excusal.id, &harness.store).await.unwrap();
    assert_eq!(kept.name, "Jane Doe");

    let again = Cadet::remove(jane.id, &harness.mirror, &harness.staff, &harness.store).await;
    assert!(matches!(again, Err(MusterError::CadetNotFound(_))));
}

#[tokio::test]
async fn mirror_failures_are_warnings() {
    let harness = harness().await;
    let broken = RosterMirror::new(harness.dir.path().join("missing").join("roster.csv"));

    let added = Cadet::add(
        NewCadet {
            name: "Jane Doe".to_owned(),
            rank: None,
        },
        &broken,
        &harness.staff,
        &harness.store,
    )
    .await
    .unwrap();

    assert!(matches!(added.warning, Some(MusterError::MirrorSync(_))));
    assert!(added.warning_message().is_some());
    assert!(Cadet::with_name_opt("jane doe", &harness.store)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn reloading_from_the_mirror_only_adds_new_names() {
    let harness = harness().await;
    harness.add_cadet("Jane Doe").await;
    std::fs::write(
        harness.mirror.path(),
        "Name\nJANE DOE\nJohn Roe\n\nAmy Brown\n",
    )
    .unwrap();

    let added = Cadet::import_from_mirror(&harness.mirror, &harness.staff, &harness.store)
        .await
        .unwrap();

    assert_eq!(added, 2);
    assert_eq!(Cadet::all(&harness.store).await.unwrap().len(), 3);
}

#[tokio::test]
async fn an_empty_store_is_seeded_from_the_mirror() {
    let harness = harness().await;
    harness.add_cadet("Jane Doe").await;
    harness.add_cadet("John Roe").await;

    let fresh = muster::db::MemoryStore::new();
    let seeded = Cadet::seed_from_mirror(&harness.mirror, &fresh).await.unwrap();
    assert_eq!(seeded, 2);
    assert_eq!(
        roster_names(&fresh).await,
        roster_names(&harness.store).await
    );

    let again = Cadet::seed_from_mirror(&harness.mirror, &fresh).await.unwrap();
    assert_eq!(again, 0);
}

#[tokio::test]
async fn the_roster_survives_a_trip_through_the_mirror() {
    let harness = harness().await;
    for name in ["Jane Doe", "amy brown", "John Roe", "Zed O'Neil, Jr."] {
        harness.add_cadet(name).await;
    }
    std::fs::remove_file(harness.mirror.path()).unwrap();

    let written = Cadet::export_to_mirror(&harness.mirror, &harness.staff, &harness.store)
        .await
        .unwrap();
    assert_eq!(written, 4);
    let before = roster_names(&harness.store).await;

    for cadet in Cadet::all(&harness.store).await.unwrap() {
        harness.store.delete_cadet(cadet.id).await.unwrap();
    }
    assert!(Cadet::all(&harness.store).await.unwrap().is_empty());

    let imported = Cadet::import_from_mirror(&harness.mirror, &harness.staff, &harness.store)
        .await
        .unwrap();
    assert_eq!(imported, 4);
    assert_eq!(roster_names(&harness.store).await, before);
}

/// The roster's names, lowercased and sorted.
async fn roster_names(store: &dyn Store) -> Vec<String> {
    let mut names = Cadet::all(store)
        .await
        .unwrap()
        .into_iter()
        .map(|cadet| normalize_name(&cadet.name))
        .collect::<Vec<_>>();
    names.sort();
    names
}
