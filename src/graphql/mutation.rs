use async_graphql::{Context, Object, Result, SimpleObject};

use crate::graphql::guards::StaffOnly;
use crate::graphql::{
    mirror_from_ctx, staff_from_ctx, store_from_ctx, SessionToken, StaffPasswordHash,
    SUCCESS_MESSAGE,
};
use crate::mirror::Synced;
use crate::models::cadet::{Cadet, CadetUpdate, NewCadet};
use crate::models::event::attendance_override::AttendanceOverride;
use crate::models::event::excusal::{Excusal, ExcusalForm, ExcusalUpdate};
use crate::models::event::{Event, NewEvent};
use crate::models::session::Session;

/// A committed roster change, plus a warning if the mirror file fell behind.
#[derive(SimpleObject)]
pub struct RosterChange {
    pub cadet: Cadet,
    pub warning: Option<String>,
}

impl From<Synced<Cadet>> for RosterChange {
    fn from(synced: Synced<Cadet>) -> Self {
        Self {
            warning: synced.warning_message(),
            cadet: synced.value,
        }
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Gets a staff token on successful login
    pub async fn login(&self, ctx: &Context<'_>, password: String) -> Result<String> {
        let StaffPasswordHash(hash) = ctx.data_unchecked::<StaffPasswordHash>();
        Ok(Session::login(&password, hash.as_deref(), store_from_ctx(ctx)).await?)
    }

    /// Ends the current staff session
    pub async fn logout(&self, ctx: &Context<'_>) -> Result<&'static str> {
        let SessionToken(token) = ctx
            .data_opt::<SessionToken>()
            .ok_or("Not currently logged in")?;
        Session::logout(token, store_from_ctx(ctx)).await?;

        Ok(SUCCESS_MESSAGE)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn add_cadet(&self, ctx: &Context<'_>, new_cadet: NewCadet) -> Result<RosterChange> {
        let staff = staff_from_ctx(ctx)?;
        let synced = Cadet::add(new_cadet, mirror_from_ctx(ctx), staff, store_from_ctx(ctx)).await?;

        Ok(synced.into())
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn update_cadet(
        &self,
        ctx: &Context<'_>,
        id: i64,
        update: CadetUpdate,
    ) -> Result<RosterChange> {
        let staff = staff_from_ctx(ctx)?;
        let synced =
            Cadet::update(id, update, mirror_from_ctx(ctx), staff, store_from_ctx(ctx)).await?;

        Ok(synced.into())
    }

    /// Removes a cadet and their overrides; their excusals stay on record
    #[graphql(guard = "StaffOnly")]
    pub async fn remove_cadet(&self, ctx: &Context<'_>, id: i64) -> Result<RosterChange> {
        let staff = staff_from_ctx(ctx)?;
        let synced = Cadet::remove(id, mirror_from_ctx(ctx), staff, store_from_ctx(ctx)).await?;

        Ok(synced.into())
    }

    /// Adds any names in the roster file that aren't on the roster yet,
    /// returning how many were added
    #[graphql(guard = "StaffOnly")]
    pub async fn reload_roster(&self, ctx: &Context<'_>) -> Result<i64> {
        let staff = staff_from_ctx(ctx)?;
        let added =
            Cadet::import_from_mirror(mirror_from_ctx(ctx), staff, store_from_ctx(ctx)).await?;

        Ok(added as i64)
    }

    /// Overwrites the roster file with the current roster, returning how
    /// many names were written
    #[graphql(guard = "StaffOnly")]
    pub async fn write_roster_file(&self, ctx: &Context<'_>) -> Result<i64> {
        let staff = staff_from_ctx(ctx)?;
        let written =
            Cadet::export_to_mirror(mirror_from_ctx(ctx), staff, store_from_ctx(ctx)).await?;

        Ok(written as i64)
    }

    pub async fn add_event(&self, ctx: &Context<'_>, new_event: NewEvent) -> Result<Event> {
        Ok(Event::create(new_event, store_from_ctx(ctx)).await?)
    }

    /// Files a pending excusal for a cadet on the roster
    pub async fn submit_excusal(&self, ctx: &Context<'_>, form: ExcusalForm) -> Result<Excusal> {
        Ok(Excusal::submit(form, store_from_ctx(ctx)).await?)
    }

    /// Edits a pending excusal; blank fields are left alone
    pub async fn update_excusal(
        &self,
        ctx: &Context<'_>,
        id: i64,
        update: ExcusalUpdate,
    ) -> Result<Excusal> {
        Ok(Excusal::update(id, update, store_from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn approve_excusal(&self, ctx: &Context<'_>, id: i64) -> Result<Excusal> {
        let staff = staff_from_ctx(ctx)?;
        Ok(Excusal::approve(id, staff, store_from_ctx(ctx)).await?)
    }

    #[graphql(guard = "StaffOnly")]
    pub async fn deny_excusal(&self, ctx: &Context<'_>, id: i64) -> Result<Excusal> {
        let staff = staff_from_ctx(ctx)?;
        Ok(Excusal::deny(id, staff, store_from_ctx(ctx)).await?)
    }

    /// Sends a decided excusal back to pending
    #[graphql(guard = "StaffOnly")]
    pub async fn reopen_excusal(&self, ctx: &Context<'_>, id: i64) -> Result<Excusal> {
        let staff = staff_from_ctx(ctx)?;
        Ok(Excusal::reopen(id, staff, store_from_ctx(ctx)).await?)
    }

    /// Approves every pending excusal for the event, or none of them
    #[graphql(guard = "StaffOnly")]
    pub async fn approve_all_for_event(
        &self,
        ctx: &Context<'_>,
        event_id: i64,
    ) -> Result<Vec<Excusal>> {
        let staff = staff_from_ctx(ctx)?;
        Ok(Excusal::approve_all_for_event(event_id, staff, store_from_ctx(ctx)).await?)
    }

    /// Pins a cadet's status at an event, whatever their excusals say
    #[graphql(guard = "StaffOnly")]
    pub async fn set_attendance(
        &self,
        ctx: &Context<'_>,
        cadet_id: i64,
        event_id: i64,
        status: String,
    ) -> Result<AttendanceOverride> {
        let staff = staff_from_ctx(ctx)?;
        Ok(AttendanceOverride::set(cadet_id, event_id, &status, staff, store_from_ctx(ctx)).await?)
    }
}
