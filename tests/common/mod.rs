#![allow(dead_code)]

use async_trait::async_trait;
use muster::db::{Change, MemoryStore, Store};
use muster::error::{MusterError, MusterResult};
use muster::mirror::RosterMirror;
use muster::models::cadet::{Cadet, NewCadet};
use muster::models::event::attendance_override::AttendanceOverride;
use muster::models::event::excusal::{Excusal, ExcusalForm, NewExcusal};
use muster::models::event::{Event, NewEvent};
use muster::models::session::{Session, StaffCapability};
use tempfile::TempDir;

pub const STAFF_PASSWORD: &str = "hunter2";

pub struct Harness {
    pub store: MemoryStore,
    pub staff: StaffCapability,
    pub mirror: RosterMirror,
    pub staff_password_hash: String,
    pub dir: TempDir,
}

/// A fresh in-memory store with a logged-in staff member and a roster file
/// in a temporary directory.
pub async fn harness() -> Harness {
    let store = MemoryStore::new();
    let staff_password_hash = bcrypt::hash(STAFF_PASSWORD, 4).unwrap();
    let token = Session::login(STAFF_PASSWORD, Some(&staff_password_hash), &store)
        .await
        .unwrap();
    let staff = Session::verify(&token, &store).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let mirror = RosterMirror::new(dir.path().join("roster.csv"));

    Harness {
        store,
        staff,
        mirror,
        staff_password_hash,
        dir,
    }
}

impl Harness {
    pub async fn add_cadet(&self, name: &str) -> Cadet {
        Cadet::add(
            NewCadet {
                name: name.to_owned(),
                rank: None,
            },
            &self.mirror,
            &self.staff,
            &self.store,
        )
        .await
        .unwrap()
        .value
    }

    pub async fn add_event(&self, name: &str, date: &str) -> Event {
        Event::create(
            NewEvent {
                name: name.to_owned(),
                date: date.to_owned(),
            },
            &self.store,
        )
        .await
        .unwrap()
    }

    pub async fn submit(&self, name: &str, event: &str, date: &str) -> Excusal {
        Excusal::submit(excusal_form(name, event, date), &self.store)
            .await
            .unwrap()
    }
}

pub fn excusal_form(name: &str, event: &str, date: &str) -> ExcusalForm {
    ExcusalForm {
        name: name.to_owned(),
        event: event.to_owned(),
        date: Some(date.to_owned()),
        reason: "Medical appointment".to_owned(),
        makeup_plan: "Attend the Thursday session".to_owned(),
        poc: "SGT Smith".to_owned(),
        ..Default::default()
    }
}

/// Reads and single writes go to the wrapped store; every batch commit fails.
pub struct FailingCommit<'a>(pub &'a MemoryStore);

#[async_trait]
impl Store for FailingCommit<'_> {
    async fn cadets(&self) -> MusterResult<Vec<Cadet>> {
        self.0.cadets().await
    }

    async fn cadet(&self, id: i64) -> MusterResult<Option<Cadet>> {
        self.0.cadet(id).await
    }

    async fn insert_cadet(&self, name: &str, rank: Option<&str>) -> MusterResult<Cadet> {
        self.0.insert_cadet(name, rank).await
    }

    async fn update_cadet(&self, cadet: &Cadet) -> MusterResult<()> {
        self.0.update_cadet(cadet).await
    }

    async fn delete_cadet(&self, id: i64) -> MusterResult<Option<Cadet>> {
        self.0.delete_cadet(id).await
    }

    async fn events(&self) -> MusterResult<Vec<Event>> {
        self.0.events().await
    }

    async fn event(&self, id: i64) -> MusterResult<Option<Event>> {
        self.0.event(id).await
    }

    async fn insert_event(&self, name: &str, date: &str) -> MusterResult<Event> {
        self.0.insert_event(name, date).await
    }

    async fn excusals(&self) -> MusterResult<Vec<Excusal>> {
        self.0.excusals().await
    }

    async fn excusal(&self, id: i64) -> MusterResult<Option<Excusal>> {
        self.0.excusal(id).await
    }

    async fn excusals_for_event(&self, event_name: &str) -> MusterResult<Vec<Excusal>> {
        self.0.excusals_for_event(event_name).await
    }

    async fn submit_excusal(&self, new_excusal: &NewExcusal) -> MusterResult<Excusal> {
        self.0.submit_excusal(new_excusal).await
    }

    async fn update_excusal(&self, excusal: &Excusal) -> MusterResult<()> {
        self.0.update_excusal(excusal).await
    }

    async fn override_for(
        &self,
        cadet_id: i64,
        event_id: i64,
    ) -> MusterResult<Option<AttendanceOverride>> {
        self.0.override_for(cadet_id, event_id).await
    }

    async fn overrides_for_event(&self, event_id: i64) -> MusterResult<Vec<AttendanceOverride>> {
        self.0.overrides_for_event(event_id).await
    }

    async fn upsert_override(
        &self,
        cadet_id: i64,
        event_id: i64,
        status: &str,
    ) -> MusterResult<AttendanceOverride> {
        self.0.upsert_override(cadet_id, event_id, status).await
    }

    async fn commit(&self, _changes: &[Change]) -> MusterResult<()> {
        Err(MusterError::ServerError("connection lost".to_owned()))
    }

    async fn insert_session(&self, token: &str) -> MusterResult<()> {
        self.0.insert_session(token).await
    }

    async fn session_exists(&self, token: &str) -> MusterResult<bool> {
        self.0.session_exists(token).await
    }

    async fn remove_session(&self, token: &str) -> MusterResult<()> {
        self.0.remove_session(token).await
    }
}
