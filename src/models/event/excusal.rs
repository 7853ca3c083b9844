use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use async_graphql::{Enum, InputObject, SimpleObject};

use crate::db::{Change, Store};
use crate::error::{MusterError, MusterResult};
use crate::models::cadet::{Cadet, CadetStatus};
use crate::models::event::Event;
use crate::models::session::StaffCapability;
use crate::util::{ensure_iso_date, names_match, today};

/// The bucket used for pending excusals that name no event.
pub const UNSPECIFIED_EVENT: &str = "Unspecified";

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct Excusal {
    /// The ID of the excusal
    pub id: i64,
    /// The date the excusal was submitted for, as `YYYY-MM-DD`
    pub date: String,
    /// The cadet that submitted it, while they remain on the roster
    pub cadet_id: Option<i64>,
    /// The submitting cadet's name as it was entered
    pub name: String,
    /// The name of the event the cadet wants to be excused from
    pub event: String,
    /// Why the cadet can't attend
    pub reason: String,
    /// How the cadet will make up the missed event
    pub makeup_plan: String,
    /// Point of contact
    pub poc: String,
    pub position: String,
    pub cpt: String,
    pub company: String,
    pub phone: String,
    pub email: String,
    /// The current state of the request
    pub status: ExcusalStatus,
}

#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExcusalStatus {
    Pending,
    Approved,
    Denied,
}

impl ExcusalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExcusalStatus::Pending => "pending",
            ExcusalStatus::Approved => "approved",
            ExcusalStatus::Denied => "denied",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != ExcusalStatus::Pending
    }

    /// The cached roster status a cadet takes on after an excusal enters this state.
    pub fn cadet_status(&self) -> CadetStatus {
        match self {
            ExcusalStatus::Pending => CadetStatus::Pending,
            ExcusalStatus::Approved => CadetStatus::Excused,
            ExcusalStatus::Denied => CadetStatus::Present,
        }
    }
}

impl fmt::Display for ExcusalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExcusalStatus {
    type Err = MusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ExcusalStatus::Pending),
            // "excused" is accepted as another name for an approval
            "approved" | "excused" => Ok(ExcusalStatus::Approved),
            "denied" => Ok(ExcusalStatus::Denied),
            other => Err(MusterError::BadRequest(format!(
                "unknown excusal status {}",
                other
            ))),
        }
    }
}

/// What a cadet fills out to request an excusal.
#[derive(InputObject, Clone, Debug, Default)]
pub struct ExcusalForm {
    /// Must match a cadet on the roster, ignoring case
    pub name: String,
    /// The name of the event to be excused from
    pub event: String,
    /// Defaults to today
    pub date: Option<String>,
    #[graphql(default)]
    pub reason: String,
    #[graphql(default)]
    pub makeup_plan: String,
    #[graphql(default)]
    pub poc: String,
    #[graphql(default)]
    pub position: String,
    #[graphql(default)]
    pub cpt: String,
    #[graphql(default)]
    pub company: String,
    #[graphql(default)]
    pub phone: String,
    #[graphql(default)]
    pub email: String,
}

/// A validated excusal ready to be stored as pending.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExcusal {
    pub date: String,
    pub cadet_id: Option<i64>,
    pub name: String,
    pub event: String,
    pub reason: String,
    pub makeup_plan: String,
    pub poc: String,
    pub position: String,
    pub cpt: String,
    pub company: String,
    pub phone: String,
    pub email: String,
}

/// A partial edit: blank or missing fields keep their current value.
#[derive(InputObject, Clone, Debug, Default)]
pub struct ExcusalUpdate {
    pub date: Option<String>,
    pub event: Option<String>,
    pub reason: Option<String>,
    pub makeup_plan: Option<String>,
    pub poc: Option<String>,
    pub position: Option<String>,
    pub cpt: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ExcusalUpdate {
    fn apply_to(self, excusal: &mut Excusal) {
        fn overwrite(field: &mut String, value: Option<String>) {
            if let Some(value) = value {
                let value = value.trim();
                if !value.is_empty() {
                    *field = value.to_owned();
                }
            }
        }

        overwrite(&mut excusal.date, self.date);
        overwrite(&mut excusal.event, self.event);
        overwrite(&mut excusal.reason, self.reason);
        overwrite(&mut excusal.makeup_plan, self.makeup_plan);
        overwrite(&mut excusal.poc, self.poc);
        overwrite(&mut excusal.position, self.position);
        overwrite(&mut excusal.cpt, self.cpt);
        overwrite(&mut excusal.company, self.company);
        overwrite(&mut excusal.phone, self.phone);
        overwrite(&mut excusal.email, self.email);
    }
}

/// Pending excusals that share an event name.
#[derive(SimpleObject, Clone, Debug)]
pub struct PendingGroup {
    pub event: String,
    pub excusals: Vec<Excusal>,
}

impl Excusal {
    pub async fn with_id(id: i64, store: &dyn Store) -> MusterResult<Self> {
        store
            .excusal(id)
            .await?
            .ok_or(MusterError::ExcusalNotFound(id))
    }

    /// Every excusal, oldest first.
    pub async fn all(store: &dyn Store) -> MusterResult<Vec<Self>> {
        store.excusals().await
    }

    pub async fn pending(store: &dyn Store) -> MusterResult<Vec<Self>> {
        Ok(Self::all(store)
            .await?
            .into_iter()
            .filter(|excusal| excusal.status == ExcusalStatus::Pending)
            .collect())
    }

    pub async fn for_event(event_name: &str, store: &dyn Store) -> MusterResult<Vec<Self>> {
        store.excusals_for_event(event_name).await
    }

    /// Pending excusals grouped by event name, in event name order.
    pub async fn pending_by_event(store: &dyn Store) -> MusterResult<Vec<PendingGroup>> {
        let mut groups = BTreeMap::<String, Vec<Excusal>>::new();
        for excusal in Self::pending(store).await? {
            let event = if excusal.event.trim().is_empty() {
                UNSPECIFIED_EVENT.to_owned()
            } else {
                excusal.event.clone()
            };
            groups.entry(event).or_default().push(excusal);
        }

        Ok(groups
            .into_iter()
            .map(|(event, excusals)| PendingGroup { event, excusals })
            .collect())
    }

    /// Whether this excusal was filed by the given cadet.
    ///
    /// The id captured at submission wins; excusals without one (because the
    /// cadet was removed, or they predate the id) fall back to the name.
    pub fn belongs_to(&self, cadet: &Cadet) -> bool {
        match self.cadet_id {
            Some(cadet_id) => cadet_id == cadet.id,
            None => names_match(&self.name, &cadet.name),
        }
    }

    async fn submitter(&self, store: &dyn Store) -> MusterResult<Option<Cadet>> {
        if let Some(cadet_id) = self.cadet_id {
            if let Some(cadet) = Cadet::with_id_opt(cadet_id, store).await? {
                return Ok(Some(cadet));
            }
        }

        Cadet::with_name_opt(&self.name, store).await
    }

    /// Files a new pending excusal and marks the cadet as pending.
    ///
    /// Fails with `CadetNotFound` when the name isn't on the roster.
    #[tracing::instrument(skip(store))]
    pub async fn submit(form: ExcusalForm, store: &dyn Store) -> MusterResult<Self> {
        let name = form.name.trim();
        let cadet = Cadet::with_name(name, store).await?;

        let date = match form.date.as_deref().map(str::trim) {
            Some(date) if !date.is_empty() => {
                ensure_iso_date(date)?;
                date.to_owned()
            }
            _ => today()?,
        };

        let new_excusal = NewExcusal {
            date,
            cadet_id: Some(cadet.id),
            name: name.to_owned(),
            event: form.event.trim().to_owned(),
            reason: form.reason,
            makeup_plan: form.makeup_plan,
            poc: form.poc,
            position: form.position,
            cpt: form.cpt,
            company: form.company,
            phone: form.phone,
            email: form.email,
        };
        let excusal = store.submit_excusal(&new_excusal).await?;
        tracing::info!(id = excusal.id, cadet = cadet.id, event = %excusal.event, "submitted excusal");

        Ok(excusal)
    }

    /// Edits the fields of a pending excusal.
    ///
    /// Approved or denied excusals must be reopened first.
    #[tracing::instrument(skip(store))]
    pub async fn update(id: i64, update: ExcusalUpdate, store: &dyn Store) -> MusterResult<Self> {
        let mut excusal = Self::with_id(id, store).await?;
        if excusal.status.is_terminal() {
            return Err(MusterError::InvalidTransition {
                id,
                from: excusal.status,
                to: excusal.status,
            });
        }
        if let Some(date) = update.date.as_deref().map(str::trim) {
            if !date.is_empty() {
                ensure_iso_date(date)?;
            }
        }

        update.apply_to(&mut excusal);
        store.update_excusal(&excusal).await?;

        Ok(excusal)
    }

    pub async fn approve(
        id: i64,
        staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Self> {
        Self::transition(id, ExcusalStatus::Pending, ExcusalStatus::Approved, staff, store).await
    }

    pub async fn deny(id: i64, staff: &StaffCapability, store: &dyn Store) -> MusterResult<Self> {
        Self::transition(id, ExcusalStatus::Pending, ExcusalStatus::Denied, staff, store).await
    }

    /// Moves an approved or denied excusal back to pending.
    pub async fn reopen(id: i64, staff: &StaffCapability, store: &dyn Store) -> MusterResult<Self> {
        let excusal = Self::with_id(id, store).await?;
        if !excusal.status.is_terminal() {
            return Err(MusterError::InvalidTransition {
                id,
                from: excusal.status,
                to: ExcusalStatus::Pending,
            });
        }

        Self::transition(id, excusal.status, ExcusalStatus::Pending, staff, store).await
    }

    #[tracing::instrument(skip(_staff, store))]
    async fn transition(
        id: i64,
        from: ExcusalStatus,
        to: ExcusalStatus,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Self> {
        let excusal = Self::with_id(id, store).await?;
        if excusal.status != from {
            return Err(MusterError::InvalidTransition {
                id,
                from: excusal.status,
                to,
            });
        }

        let mut changes = vec![Change::ExcusalStatus { id, from, to }];
        if let Some(cadet) = excusal.submitter(store).await? {
            changes.push(Change::CadetStatus {
                id: cadet.id,
                status: to.cadet_status(),
            });
        }
        store.commit(&changes).await?;
        tracing::info!(id, %from, %to, "excusal status changed");

        Self::with_id(id, store).await
    }

    /// Approves every pending excusal filed against the event, all at once.
    ///
    /// Returns the approved excusals. If any of them can't be approved, none
    /// are.
    #[tracing::instrument(skip(_staff, store))]
    pub async fn approve_all_for_event(
        event_id: i64,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Vec<Self>> {
        let event = Event::with_id(event_id, store).await?;
        let pending = Self::for_event(&event.name, store)
            .await?
            .into_iter()
            .filter(|excusal| excusal.status == ExcusalStatus::Pending)
            .collect::<Vec<_>>();

        let mut changes = Vec::with_capacity(pending.len() * 2);
        for excusal in &pending {
            changes.push(Change::ExcusalStatus {
                id: excusal.id,
                from: ExcusalStatus::Pending,
                to: ExcusalStatus::Approved,
            });
            if let Some(cadet) = excusal.submitter(store).await? {
                changes.push(Change::CadetStatus {
                    id: cadet.id,
                    status: CadetStatus::Excused,
                });
            }
        }
        store.commit(&changes).await?;
        tracing::info!(event = %event.name, approved = pending.len(), "bulk approved excusals");

        Ok(pending
            .into_iter()
            .map(|excusal| Excusal {
                status: ExcusalStatus::Approved,
                ..excusal
            })
            .collect())
    }
}
