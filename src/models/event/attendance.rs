//! Resolution of a cadet's attendance at an event.
//!
//! Three sources can speak to the same (cadet, event) pair. They are checked
//! in order and the first one present decides:
//!
//! 1. a staff override, echoed exactly as entered,
//! 2. the cadet's latest excusal for the event (pending stays pending,
//!    approved becomes excused, denied becomes present),
//! 3. otherwise the cadet is present.
//!
//! The attendance sheet and the attendance export both go through
//! [`resolve`], and nothing here writes to the store.

use std::fmt;

use async_graphql::{ComplexObject, SimpleObject};

use crate::db::Store;
use crate::error::MusterResult;
use crate::models::cadet::Cadet;
use crate::models::event::attendance_override::AttendanceOverride;
use crate::models::event::excusal::{Excusal, ExcusalStatus};
use crate::models::event::Event;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Pending,
    Excused,
    /// Anything else staff typed into an override, kept verbatim.
    Custom(String),
}

impl AttendanceStatus {
    /// Reads an override's stored text. Only the exact canonical spellings map
    /// to the known variants.
    pub fn from_stored(status: &str) -> Self {
        match status {
            "present" => AttendanceStatus::Present,
            "pending" => AttendanceStatus::Pending,
            "excused" => AttendanceStatus::Excused,
            other => AttendanceStatus::Custom(other.to_owned()),
        }
    }

    pub fn from_excusal(status: ExcusalStatus) -> Self {
        match status {
            ExcusalStatus::Pending => AttendanceStatus::Pending,
            ExcusalStatus::Approved => AttendanceStatus::Excused,
            ExcusalStatus::Denied => AttendanceStatus::Present,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttendanceStatus::Present => "present",
            AttendanceStatus::Pending => "pending",
            AttendanceStatus::Excused => "excused",
            AttendanceStatus::Custom(status) => status,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, AttendanceStatus::Custom(_))
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome for one (cadet, event) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub status: AttendanceStatus,
    /// The excusal that decided the status, if one did.
    pub excusal: Option<&'a Excusal>,
    pub overridden: bool,
}

/// Resolves the cadet's status at the event.
///
/// `overrides` and `excusals` may hold records for other pairs; only the
/// ones for this cadet and event are considered. Excusals match on the exact
/// event name. Among several, the latest date wins, then the latest
/// submission.
pub fn resolve<'a>(
    cadet: &Cadet,
    event: &Event,
    overrides: &[AttendanceOverride],
    excusals: &'a [Excusal],
) -> Resolution<'a> {
    if let Some(attendance_override) = overrides
        .iter()
        .find(|o| o.cadet_id == cadet.id && o.event_id == event.id)
    {
        return Resolution {
            status: attendance_override.attendance_status(),
            excusal: None,
            overridden: true,
        };
    }

    let latest = excusals
        .iter()
        .filter(|excusal| excusal.event == event.name && excusal.belongs_to(cadet))
        .max_by(|a, b| (a.date.as_str(), a.id).cmp(&(b.date.as_str(), b.id)));

    match latest {
        Some(excusal) => Resolution {
            status: AttendanceStatus::from_excusal(excusal.status),
            excusal: Some(excusal),
            overridden: false,
        },
        None => Resolution {
            status: AttendanceStatus::Present,
            excusal: None,
            overridden: false,
        },
    }
}

#[derive(SimpleObject, Clone, Debug)]
#[graphql(complex)]
pub struct AttendanceRow {
    pub cadet: Cadet,
    /// The excusal that decided the status, if any
    pub excusal: Option<Excusal>,
    /// Whether a staff override decided the status
    pub overridden: bool,

    #[graphql(skip)]
    pub status: AttendanceStatus,
}

#[ComplexObject]
impl AttendanceRow {
    /// The resolved status: present, pending, excused, or whatever an override says
    pub async fn status(&self) -> String {
        self.status.to_string()
    }

    /// Whether the status came from an override outside the usual three values
    pub async fn custom(&self) -> bool {
        self.status.is_custom()
    }
}

impl AttendanceRow {
    fn resolved(
        cadet: Cadet,
        event: &Event,
        overrides: &[AttendanceOverride],
        excusals: &[Excusal],
    ) -> Self {
        let resolution = resolve(&cadet, event, overrides, excusals);

        Self {
            status: resolution.status,
            excusal: resolution.excusal.cloned(),
            overridden: resolution.overridden,
            cadet,
        }
    }

    /// Resolves a single cadet at a single event.
    pub async fn for_cadet_at_event(
        cadet_id: i64,
        event_id: i64,
        store: &dyn Store,
    ) -> MusterResult<Self> {
        let cadet = Cadet::with_id(cadet_id, store).await?;
        let event = Event::with_id(event_id, store).await?;
        let overrides = AttendanceOverride::for_cadet_at_event_opt(cadet_id, event_id, store)
            .await?
            .into_iter()
            .collect::<Vec<_>>();
        let excusals = Excusal::for_event(&event.name, store).await?;

        Ok(Self::resolved(cadet, &event, &overrides, &excusals))
    }
}

/// Every cadet's resolved status at one event, in roster order.
#[derive(SimpleObject, Clone, Debug)]
pub struct AttendanceSheet {
    pub event: Event,
    pub rows: Vec<AttendanceRow>,
}

impl AttendanceSheet {
    pub async fn for_event(event: Event, store: &dyn Store) -> MusterResult<Self> {
        let cadets = Cadet::all(store).await?;
        let overrides = AttendanceOverride::for_event(event.id, store).await?;
        let excusals = Excusal::for_event(&event.name, store).await?;

        let rows = cadets
            .into_iter()
            .map(|cadet| AttendanceRow::resolved(cadet, &event, &overrides, &excusals))
            .collect();

        Ok(Self { event, rows })
    }

    pub async fn for_event_id(event_id: i64, store: &dyn Store) -> MusterResult<Self> {
        let event = Event::with_id(event_id, store).await?;
        Self::for_event(event, store).await
    }

    /// The sheet for the given event, or for the earliest event when none is
    /// given. `None` when there are no events at all.
    pub async fn selected(event_id: Option<i64>, store: &dyn Store) -> MusterResult<Option<Self>> {
        let event = match event_id {
            Some(event_id) => Some(Event::with_id(event_id, store).await?),
            None => Event::first(store).await?,
        };

        match event {
            Some(event) => Ok(Some(Self::for_event(event, store).await?)),
            None => Ok(None),
        }
    }
}
