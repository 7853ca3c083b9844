use async_graphql::SimpleObject;

use crate::db::Store;
use crate::error::{MusterError, MusterResult};
use crate::models::cadet::Cadet;
use crate::models::event::attendance::AttendanceStatus;
use crate::models::event::Event;
use crate::models::session::StaffCapability;

/// A status pinned by staff for one cadet at one event.
#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct AttendanceOverride {
    pub id: i64,
    pub cadet_id: i64,
    pub event_id: i64,
    /// Exactly what staff entered
    pub status: String,
}

impl AttendanceOverride {
    pub fn attendance_status(&self) -> AttendanceStatus {
        AttendanceStatus::from_stored(&self.status)
    }

    pub async fn for_cadet_at_event_opt(
        cadet_id: i64,
        event_id: i64,
        store: &dyn Store,
    ) -> MusterResult<Option<Self>> {
        store.override_for(cadet_id, event_id).await
    }

    pub async fn for_event(event_id: i64, store: &dyn Store) -> MusterResult<Vec<Self>> {
        store.overrides_for_event(event_id).await
    }

    /// Pins `status` for the cadet at the event, replacing any earlier override.
    #[tracing::instrument(skip(_staff, store))]
    pub async fn set(
        cadet_id: i64,
        event_id: i64,
        status: &str,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Self> {
        if status.trim().is_empty() {
            return Err(MusterError::BadRequest(
                "an override needs a status".to_owned(),
            ));
        }
        Cadet::with_id(cadet_id, store).await?;
        Event::with_id(event_id, store).await?;

        let attendance_override = store.upsert_override(cadet_id, event_id, status).await?;
        tracing::info!(cadet_id, event_id, status, "saved attendance override");

        Ok(attendance_override)
    }
}
