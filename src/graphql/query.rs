use async_graphql::{Context, Object, Result};

use crate::graphql::guards::StaffOnly;
use crate::graphql::{mirror_from_ctx, store_from_ctx};
use crate::models::cadet::Cadet;
use crate::models::event::attendance::{AttendanceRow, AttendanceSheet};
use crate::models::event::excusal::{Excusal, PendingGroup};
use crate::models::event::Event;
use crate::models::session::StaffCapability;

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Whether the request carries a live staff session
    pub async fn is_staff(&self, ctx: &Context<'_>) -> bool {
        ctx.data_opt::<StaffCapability>().is_some()
    }

    /// The roster, ordered by name
    #[graphql(guard = "StaffOnly")]
    pub async fn cadets(&self, ctx: &Context<'_>) -> Result<Vec<Cadet>> {
        Ok(Cadet::all(store_from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn cadet(&self, ctx: &Context<'_>, id: i64) -> Result<Cadet> {
        Ok(Cadet::with_id(id, store_from_ctx(ctx)).await?)
    }

    /// Where the roster mirror file lives
    #[graphql(guard = "StaffOnly")]
    pub async fn roster_file(&self, ctx: &Context<'_>) -> String {
        mirror_from_ctx(ctx).path().display().to_string()
    }

    /// Every event, ordered by date
    pub async fn events(&self, ctx: &Context<'_>) -> Result<Vec<Event>> {
        Ok(Event::all(store_from_ctx(ctx)).await?)
    }

    /// Events happening today or later, for the excusal form
    pub async fn upcoming_events(&self, ctx: &Context<'_>) -> Result<Vec<Event>> {
        Ok(Event::upcoming(store_from_ctx(ctx)).await?)
    }

    pub async fn event(&self, ctx: &Context<'_>, id: i64) -> Result<Event> {
        Ok(Event::with_id(id, store_from_ctx(ctx)).await?)
    }

    pub async fn excusal(&self, ctx: &Context<'_>, id: i64) -> Result<Excusal> {
        Ok(Excusal::with_id(id, store_from_ctx(ctx)).await?)
    }

    /// The full excusal log, oldest first
    #[graphql(guard = "StaffOnly")]
    pub async fn excusals(&self, ctx: &Context<'_>) -> Result<Vec<Excusal>> {
        Ok(Excusal::all(store_from_ctx(ctx)).await?)
    }

    /// Excusals still waiting on a decision
    pub async fn pending_excusals(&self, ctx: &Context<'_>) -> Result<Vec<Excusal>> {
        Ok(Excusal::pending(store_from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn pending_by_event(&self, ctx: &Context<'_>) -> Result<Vec<PendingGroup>> {
        Ok(Excusal::pending_by_event(store_from_ctx(ctx)).await?)
    }

    /// The attendance sheet for an event, or for the earliest event if none
    /// is given. Null when there are no events.
    #[graphql(guard = "StaffOnly")]
    pub async fn attendance(
        &self,
        ctx: &Context<'_>,
        event_id: Option<i64>,
    ) -> Result<Option<AttendanceSheet>> {
        Ok(AttendanceSheet::selected(event_id, store_from_ctx(ctx)).await?)
    }

    /// One cadet's resolved status at one event
    #[graphql(guard = "StaffOnly")]
    pub async fn resolved_attendance(
        &self,
        ctx: &Context<'_>,
        cadet_id: i64,
        event_id: i64,
    ) -> Result<AttendanceRow> {
        Ok(AttendanceRow::for_cadet_at_event(cadet_id, event_id, store_from_ctx(ctx)).await?)
    }
}
