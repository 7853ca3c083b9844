use std::fmt;
use std::str::FromStr;

use async_graphql::{Enum, InputObject, SimpleObject};

use crate::db::Store;
use crate::error::{MusterError, MusterResult};
use crate::mirror::{RosterMirror, Synced};
use crate::models::session::StaffCapability;
use crate::util::names_match;

#[derive(SimpleObject, Clone, Debug, PartialEq, Eq)]
pub struct Cadet {
    /// The ID of the cadet
    pub id: i64,
    /// The cadet's name, unique ignoring case
    pub name: String,
    /// The cadet's rank, if known
    pub rank: Option<String>,
    /// A coarse status kept for the roster view
    ///
    /// This follows the cadet's latest excusal action and says nothing about any
    /// particular event; see the attendance sheet for that.
    pub status: CadetStatus,
}

#[derive(Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CadetStatus {
    Present,
    Pending,
    Excused,
}

impl CadetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CadetStatus::Present => "present",
            CadetStatus::Pending => "pending",
            CadetStatus::Excused => "excused",
        }
    }
}

impl fmt::Display for CadetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CadetStatus {
    type Err = MusterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" => Ok(CadetStatus::Present),
            "pending" => Ok(CadetStatus::Pending),
            "excused" => Ok(CadetStatus::Excused),
            other => Err(MusterError::BadRequest(format!(
                "unknown cadet status {}",
                other
            ))),
        }
    }
}

#[derive(InputObject, Clone, Debug)]
pub struct NewCadet {
    pub name: String,
    pub rank: Option<String>,
}

#[derive(InputObject, Clone, Debug, Default)]
pub struct CadetUpdate {
    /// A blank or missing name keeps the current one
    pub name: Option<String>,
    pub rank: Option<String>,
}

impl Cadet {
    pub async fn with_id(id: i64, store: &dyn Store) -> MusterResult<Self> {
        Self::with_id_opt(id, store)
            .await?
            .ok_or_else(|| MusterError::CadetNotFound(format!("id {}", id)))
    }

    pub async fn with_id_opt(id: i64, store: &dyn Store) -> MusterResult<Option<Self>> {
        store.cadet(id).await
    }

    /// All cadets, ordered by name.
    pub async fn all(store: &dyn Store) -> MusterResult<Vec<Self>> {
        store.cadets().await
    }

    /// The cadet whose name matches ignoring case and surrounding whitespace.
    pub async fn with_name_opt(name: &str, store: &dyn Store) -> MusterResult<Option<Self>> {
        Ok(Self::all(store)
            .await?
            .into_iter()
            .find(|cadet| names_match(&cadet.name, name)))
    }

    pub async fn with_name(name: &str, store: &dyn Store) -> MusterResult<Self> {
        Self::with_name_opt(name, store)
            .await?
            .ok_or_else(|| MusterError::CadetNotFound(name.trim().to_owned()))
    }

    #[tracing::instrument(skip(mirror, store, _staff))]
    pub async fn add(
        new_cadet: NewCadet,
        mirror: &RosterMirror,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Synced<Cadet>> {
        let name = new_cadet.name.trim();
        if name.is_empty() {
            return Err(MusterError::BadRequest("cadet name is required".to_owned()));
        }
        if Self::with_name_opt(name, store).await?.is_some() {
            return Err(MusterError::DuplicateCadet(name.to_owned()));
        }

        let rank = new_cadet
            .rank
            .as_deref()
            .map(str::trim)
            .filter(|rank| !rank.is_empty());
        let cadet = store.insert_cadet(name, rank).await?;
        tracing::info!(id = cadet.id, name = %cadet.name, "added cadet");

        Ok(Synced::new(cadet, mirror.add(name)))
    }

    #[tracing::instrument(skip(mirror, store, _staff))]
    pub async fn update(
        id: i64,
        update: CadetUpdate,
        mirror: &RosterMirror,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Synced<Cadet>> {
        let mut cadet = Self::with_id(id, store).await?;
        let old_name = cadet.name.clone();

        if let Some(name) = update.name.as_deref().map(str::trim) {
            if !name.is_empty() {
                if let Some(other) = Self::with_name_opt(name, store).await? {
                    if other.id != id {
                        return Err(MusterError::DuplicateCadet(name.to_owned()));
                    }
                }
                cadet.name = name.to_owned();
            }
        }
        if let Some(rank) = update.rank.as_deref().map(str::trim) {
            cadet.rank = Some(rank.to_owned()).filter(|rank| !rank.is_empty());
        }

        store.update_cadet(&cadet).await?;

        let sync_result = if old_name != cadet.name {
            tracing::info!(id, from = %old_name, to = %cadet.name, "renamed cadet");
            mirror.rename(&old_name, &cadet.name)
        } else {
            Ok(())
        };

        Ok(Synced::new(cadet, sync_result))
    }

    /// Removes the cadet along with its overrides.
    ///
    /// Excusals filed under the cadet's name are kept as history.
    #[tracing::instrument(skip(mirror, store, _staff))]
    pub async fn remove(
        id: i64,
        mirror: &RosterMirror,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<Synced<Cadet>> {
        let cadet = store
            .delete_cadet(id)
            .await?
            .ok_or_else(|| MusterError::CadetNotFound(format!("id {}", id)))?;
        tracing::info!(id, name = %cadet.name, "removed cadet");

        let sync_result = mirror.remove(&cadet.name);
        Ok(Synced::new(cadet, sync_result))
    }

    /// Adds every name from the mirror file that isn't on the roster yet.
    ///
    /// Returns how many cadets were added.
    pub async fn import_from_mirror(
        mirror: &RosterMirror,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<usize> {
        if !mirror.exists() {
            return Err(MusterError::BadRequest(format!(
                "{} not found",
                mirror.path().display()
            )));
        }

        Self::import_names(mirror.read_names()?, store).await
    }

    /// Rewrites the mirror file from the current roster, returning how many
    /// names it now holds.
    pub async fn export_to_mirror(
        mirror: &RosterMirror,
        _staff: &StaffCapability,
        store: &dyn Store,
    ) -> MusterResult<usize> {
        let names = Self::all(store)
            .await?
            .into_iter()
            .map(|cadet| cadet.name)
            .collect::<Vec<_>>();
        mirror.write_names(&names)?;

        tracing::info!(written = names.len(), path = %mirror.path().display(), "exported roster");
        Ok(names.len())
    }

    pub async fn import_names(names: Vec<String>, store: &dyn Store) -> MusterResult<usize> {
        let mut existing = Self::all(store).await?;
        let mut added = 0;

        for name in names {
            if existing.iter().any(|cadet| names_match(&cadet.name, &name)) {
                continue;
            }

            existing.push(store.insert_cadet(name.trim(), None).await?);
            added += 1;
        }

        tracing::info!(added, "imported roster");
        Ok(added)
    }

    /// Seeds an empty roster from the mirror file, if there is one.
    pub async fn seed_from_mirror(mirror: &RosterMirror, store: &dyn Store) -> MusterResult<usize> {
        if !mirror.exists() || !Self::all(store).await?.is_empty() {
            return Ok(0);
        }

        Self::import_names(mirror.read_names()?, store).await
    }
}
