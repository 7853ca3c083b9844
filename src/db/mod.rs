//! The seam between the models and the transactional store.
//!
//! [`PgStore`] is the production backend. [`MemoryStore`] keeps the same
//! tables in process and backs the tests and database-less runs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MusterResult;
use crate::models::cadet::{Cadet, CadetStatus};
use crate::models::event::attendance_override::AttendanceOverride;
use crate::models::event::excusal::{Excusal, ExcusalStatus, NewExcusal};
use crate::models::event::Event;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn Store>;

/// One step of an atomic batch applied by [`Store::commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Change {
    /// Moves an excusal between statuses. Fails the batch unless the excusal
    /// is currently in `from`.
    ExcusalStatus {
        id: i64,
        from: ExcusalStatus,
        to: ExcusalStatus,
    },
    /// Rewrites a cadet's cached status. Fails the batch if the cadet is gone.
    CadetStatus { id: i64, status: CadetStatus },
}

#[async_trait]
pub trait Store: Send + Sync {
    /// All cadets, ordered by name.
    async fn cadets(&self) -> MusterResult<Vec<Cadet>>;
    async fn cadet(&self, id: i64) -> MusterResult<Option<Cadet>>;
    /// Fails with `DuplicateCadet` if the name is taken, ignoring case.
    async fn insert_cadet(&self, name: &str, rank: Option<&str>) -> MusterResult<Cadet>;
    async fn update_cadet(&self, cadet: &Cadet) -> MusterResult<()>;
    /// Removes the cadet and its overrides. Excusals keep the cadet's name but
    /// lose the id reference.
    async fn delete_cadet(&self, id: i64) -> MusterResult<Option<Cadet>>;

    /// All events, ordered by date.
    async fn events(&self) -> MusterResult<Vec<Event>>;
    async fn event(&self, id: i64) -> MusterResult<Option<Event>>;
    async fn insert_event(&self, name: &str, date: &str) -> MusterResult<Event>;

    /// All excusals, ordered by date and then by submission order.
    async fn excusals(&self) -> MusterResult<Vec<Excusal>>;
    async fn excusal(&self, id: i64) -> MusterResult<Option<Excusal>>;
    /// Excusals whose event field equals `event_name` exactly.
    async fn excusals_for_event(&self, event_name: &str) -> MusterResult<Vec<Excusal>>;
    /// Stores a pending excusal and marks the submitting cadet as pending.
    /// Both writes happen or neither does; a `cadet_id` that names no cadet
    /// fails with `CadetNotFound`.
    async fn submit_excusal(&self, new_excusal: &NewExcusal) -> MusterResult<Excusal>;
    /// Overwrites every field except the status.
    async fn update_excusal(&self, excusal: &Excusal) -> MusterResult<()>;

    async fn override_for(
        &self,
        cadet_id: i64,
        event_id: i64,
    ) -> MusterResult<Option<AttendanceOverride>>;
    async fn overrides_for_event(&self, event_id: i64) -> MusterResult<Vec<AttendanceOverride>>;
    async fn upsert_override(
        &self,
        cadet_id: i64,
        event_id: i64,
        status: &str,
    ) -> MusterResult<AttendanceOverride>;

    /// Applies every change or none of them.
    async fn commit(&self, changes: &[Change]) -> MusterResult<()>;

    async fn insert_session(&self, token: &str) -> MusterResult<()>;
    async fn session_exists(&self, token: &str) -> MusterResult<bool>;
    async fn remove_session(&self, token: &str) -> MusterResult<()>;
}
