use async_graphql::{ComplexObject, Context, InputObject, Result, SimpleObject};

use crate::db::Store;
use crate::error::{MusterError, MusterResult};
use crate::graphql::guards::StaffOnly;
use crate::graphql::store_from_ctx;
use crate::models::event::attendance::{AttendanceRow, AttendanceSheet};
use crate::models::event::excusal::Excusal;
use crate::models::DEFAULT_EVENTS;
use crate::util::{ensure_iso_date, today};

pub mod attendance;
pub mod attendance_override;
pub mod excusal;

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
#[graphql(complex)]
pub struct Event {
    /// The ID of the event
    pub id: i64,
    /// The name of the event
    pub name: String,
    /// When the event happens, as `YYYY-MM-DD`
    pub date: String,
}

#[ComplexObject]
impl Event {
    /// The excusals filed against this event
    #[graphql(guard = "StaffOnly")]
    pub async fn excusals(&self, ctx: &Context<'_>) -> Result<Vec<Excusal>> {
        let store = store_from_ctx(ctx);
        Excusal::for_event(&self.name, store).await.map_err(Into::into)
    }

    /// The resolved attendance of every cadet at this event
    #[graphql(guard = "StaffOnly")]
    pub async fn attendance(&self, ctx: &Context<'_>) -> Result<Vec<AttendanceRow>> {
        let store = store_from_ctx(ctx);
        let sheet = AttendanceSheet::for_event(self.clone(), store).await?;

        Ok(sheet.rows)
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct NewEvent {
    pub name: String,
    /// `YYYY-MM-DD`
    pub date: String,
}

impl Event {
    pub async fn with_id(id: i64, store: &dyn Store) -> MusterResult<Self> {
        Self::with_id_opt(id, store)
            .await?
            .ok_or(MusterError::EventNotFound(id))
    }

    pub async fn with_id_opt(id: i64, store: &dyn Store) -> MusterResult<Option<Self>> {
        store.event(id).await
    }

    /// All events, ordered by date.
    pub async fn all(store: &dyn Store) -> MusterResult<Vec<Self>> {
        store.events().await
    }

    /// Events happening today or later, ordered by date.
    pub async fn upcoming(store: &dyn Store) -> MusterResult<Vec<Self>> {
        Ok(Self::upcoming_from(Self::all(store).await?, &today()?))
    }

    /// Keeps the events on or after `today`.
    ///
    /// Dates are compared as text, which orders correctly for zero-padded
    /// `YYYY-MM-DD` strings.
    pub fn upcoming_from(events: Vec<Self>, today: &str) -> Vec<Self> {
        events
            .into_iter()
            .filter(|event| event.date.as_str() >= today)
            .collect()
    }

    /// The earliest event, used when no event is selected.
    pub async fn first(store: &dyn Store) -> MusterResult<Option<Self>> {
        Ok(Self::all(store).await?.into_iter().next())
    }

    #[tracing::instrument(skip(store))]
    pub async fn create(new_event: NewEvent, store: &dyn Store) -> MusterResult<Self> {
        let name = new_event.name.trim();
        let date = new_event.date.trim();
        if name.is_empty() || date.is_empty() {
            return Err(MusterError::BadRequest(
                "events need both a name and a date".to_owned(),
            ));
        }
        ensure_iso_date(date)?;

        let event = store.insert_event(name, date).await?;
        tracing::info!(id = event.id, name = %event.name, date = %event.date, "added event");

        Ok(event)
    }

    /// Fills an empty catalog with the default events.
    pub async fn seed_defaults(store: &dyn Store) -> MusterResult<usize> {
        if !Self::all(store).await?.is_empty() {
            return Ok(0);
        }

        for (name, date) in DEFAULT_EVENTS {
            store.insert_event(name, date).await?;
        }

        Ok(DEFAULT_EVENTS.len())
    }
}
