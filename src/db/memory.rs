use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::{Change, Store};
use crate::error::{MusterError, MusterResult};
use crate::models::cadet::{Cadet, CadetStatus};
use crate::models::event::attendance_override::AttendanceOverride;
use crate::models::event::excusal::{Excusal, ExcusalStatus, NewExcusal};
use crate::models::event::Event;
use crate::util::{names_match, normalize_name};

#[derive(Clone, Default)]
struct Tables {
    cadets: BTreeMap<i64, Cadet>,
    events: BTreeMap<i64, Event>,
    excusals: BTreeMap<i64, Excusal>,
    overrides: BTreeMap<(i64, i64), AttendanceOverride>,
    sessions: HashSet<String>,
    cadet_seq: i64,
    event_seq: i64,
    excusal_seq: i64,
    override_seq: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

impl Tables {
    fn apply(&mut self, change: &Change) -> MusterResult<()> {
        match *change {
            Change::ExcusalStatus { id, from, to } => {
                let excusal = self
                    .excusals
                    .get_mut(&id)
                    .ok_or(MusterError::ExcusalNotFound(id))?;
                if excusal.status != from {
                    return Err(MusterError::InvalidTransition {
                        id,
                        from: excusal.status,
                        to,
                    });
                }
                excusal.status = to;
            }
            Change::CadetStatus { id, status } => {
                let cadet = self
                    .cadets
                    .get_mut(&id)
                    .ok_or_else(|| MusterError::CadetNotFound(format!("id {}", id)))?;
                cadet.status = status;
            }
        }

        Ok(())
    }

    fn sorted_excusals<'a>(excusals: impl Iterator<Item = &'a Excusal>) -> Vec<Excusal> {
        let mut excusals = excusals.cloned().collect::<Vec<_>>();
        excusals.sort_by(|a, b| (a.date.as_str(), a.id).cmp(&(b.date.as_str(), b.id)));
        excusals
    }
}

/// A [`Store`] that keeps everything in process.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn cadets(&self) -> MusterResult<Vec<Cadet>> {
        let tables = self.tables.read().await;
        let mut cadets = tables.cadets.values().cloned().collect::<Vec<_>>();
        cadets.sort_by(|a, b| {
            (normalize_name(&a.name), &a.name, a.id).cmp(&(normalize_name(&b.name), &b.name, b.id))
        });

        Ok(cadets)
    }

    async fn cadet(&self, id: i64) -> MusterResult<Option<Cadet>> {
        Ok(self.tables.read().await.cadets.get(&id).cloned())
    }

    async fn insert_cadet(&self, name: &str, rank: Option<&str>) -> MusterResult<Cadet> {
        let mut tables = self.tables.write().await;
        if tables
            .cadets
            .values()
            .any(|cadet| names_match(&cadet.name, name))
        {
            return Err(MusterError::DuplicateCadet(name.to_owned()));
        }

        let cadet = Cadet {
            id: next(&mut tables.cadet_seq),
            name: name.to_owned(),
            rank: rank.map(ToOwned::to_owned),
            status: CadetStatus::Present,
        };
        tables.cadets.insert(cadet.id, cadet.clone());

        Ok(cadet)
    }

    async fn update_cadet(&self, cadet: &Cadet) -> MusterResult<()> {
        let mut tables = self.tables.write().await;
        if tables
            .cadets
            .values()
            .any(|other| other.id != cadet.id && names_match(&other.name, &cadet.name))
        {
            return Err(MusterError::DuplicateCadet(cadet.name.clone()));
        }

        let existing = tables
            .cadets
            .get_mut(&cadet.id)
            .ok_or_else(|| MusterError::CadetNotFound(format!("id {}", cadet.id)))?;
        *existing = cadet.clone();

        Ok(())
    }

    async fn delete_cadet(&self, id: i64) -> MusterResult<Option<Cadet>> {
        let mut tables = self.tables.write().await;
        let cadet = match tables.cadets.remove(&id) {
            Some(cadet) => cadet,
            None => return Ok(None),
        };

        tables.overrides.retain(|(cadet_id, _), _| *cadet_id != id);
        for excusal in tables.excusals.values_mut() {
            if excusal.cadet_id == Some(id) {
                excusal.cadet_id = None;
            }
        }

        Ok(Some(cadet))
    }

    async fn events(&self) -> MusterResult<Vec<Event>> {
        let tables = self.tables.read().await;
        let mut events = tables.events.values().cloned().collect::<Vec<_>>();
        events.sort_by(|a, b| (a.date.as_str(), a.id).cmp(&(b.date.as_str(), b.id)));

        Ok(events)
    }

    async fn event(&self, id: i64) -> MusterResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn insert_event(&self, name: &str, date: &str) -> MusterResult<Event> {
        let mut tables = self.tables.write().await;
        let event = Event {
            id: next(&mut tables.event_seq),
            name: name.to_owned(),
            date: date.to_owned(),
        };
        tables.events.insert(event.id, event.clone());

        Ok(event)
    }

    async fn excusals(&self) -> MusterResult<Vec<Excusal>> {
        let tables = self.tables.read().await;
        Ok(Tables::sorted_excusals(tables.excusals.values()))
    }

    async fn excusal(&self, id: i64) -> MusterResult<Option<Excusal>> {
        Ok(self.tables.read().await.excusals.get(&id).cloned())
    }

    async fn excusals_for_event(&self, event_name: &str) -> MusterResult<Vec<Excusal>> {
        let tables = self.tables.read().await;
        Ok(Tables::sorted_excusals(
            tables
                .excusals
                .values()
                .filter(|excusal| excusal.event == event_name),
        ))
    }

    async fn submit_excusal(&self, new_excusal: &NewExcusal) -> MusterResult<Excusal> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        let new_excusal = new_excusal.clone();

        if let Some(cadet_id) = new_excusal.cadet_id {
            staged.apply(&Change::CadetStatus {
                id: cadet_id,
                status: CadetStatus::Pending,
            })?;
        }

        let excusal = Excusal {
            id: next(&mut staged.excusal_seq),
            date: new_excusal.date,
            cadet_id: new_excusal.cadet_id,
            name: new_excusal.name,
            event: new_excusal.event,
            reason: new_excusal.reason,
            makeup_plan: new_excusal.makeup_plan,
            poc: new_excusal.poc,
            position: new_excusal.position,
            cpt: new_excusal.cpt,
            company: new_excusal.company,
            phone: new_excusal.phone,
            email: new_excusal.email,
            status: ExcusalStatus::Pending,
        };
        staged.excusals.insert(excusal.id, excusal.clone());
        *tables = staged;

        Ok(excusal)
    }

    async fn update_excusal(&self, excusal: &Excusal) -> MusterResult<()> {
        let mut tables = self.tables.write().await;
        let existing = tables
            .excusals
            .get_mut(&excusal.id)
            .ok_or(MusterError::ExcusalNotFound(excusal.id))?;
        let status = existing.status;
        *existing = Excusal {
            status,
            ..excusal.clone()
        };

        Ok(())
    }

    async fn override_for(
        &self,
        cadet_id: i64,
        event_id: i64,
    ) -> MusterResult<Option<AttendanceOverride>> {
        let tables = self.tables.read().await;
        Ok(tables.overrides.get(&(cadet_id, event_id)).cloned())
    }

    async fn overrides_for_event(&self, event_id: i64) -> MusterResult<Vec<AttendanceOverride>> {
        let tables = self.tables.read().await;
        Ok(tables
            .overrides
            .values()
            .filter(|o| o.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn upsert_override(
        &self,
        cadet_id: i64,
        event_id: i64,
        status: &str,
    ) -> MusterResult<AttendanceOverride> {
        let mut tables = self.tables.write().await;
        if !tables.cadets.contains_key(&cadet_id) {
            return Err(MusterError::CadetNotFound(format!("id {}", cadet_id)));
        }
        if !tables.events.contains_key(&event_id) {
            return Err(MusterError::EventNotFound(event_id));
        }

        if let Some(existing) = tables.overrides.get_mut(&(cadet_id, event_id)) {
            existing.status = status.to_owned();
            return Ok(existing.clone());
        }

        let attendance_override = AttendanceOverride {
            id: next(&mut tables.override_seq),
            cadet_id,
            event_id,
            status: status.to_owned(),
        };
        tables
            .overrides
            .insert((cadet_id, event_id), attendance_override.clone());

        Ok(attendance_override)
    }

    async fn commit(&self, changes: &[Change]) -> MusterResult<()> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        for change in changes {
            staged.apply(change)?;
        }
        *tables = staged;

        Ok(())
    }

    async fn insert_session(&self, token: &str) -> MusterResult<()> {
        self.tables.write().await.sessions.insert(token.to_owned());
        Ok(())
    }

    async fn session_exists(&self, token: &str) -> MusterResult<bool> {
        Ok(self.tables.read().await.sessions.contains(token))
    }

    async fn remove_session(&self, token: &str) -> MusterResult<()> {
        self.tables.write().await.sessions.remove(token);
        Ok(())
    }
}
