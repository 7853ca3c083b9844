use uuid::Uuid;

use crate::db::Store;
use crate::error::{MusterError, MusterResult};

/// Proof that the caller holds a live staff session.
///
/// Only [`Session::verify`] hands these out, so any operation that takes a
/// `&StaffCapability` can only be reached by staff.
#[derive(Debug)]
pub struct StaffCapability {
    _private: (),
}

pub struct Session;

impl Session {
    /// Checks the password against the staff hash and issues a new token.
    pub async fn login(
        password: &str,
        staff_hash: Option<&str>,
        store: &dyn Store,
    ) -> MusterResult<String> {
        let hash = staff_hash.ok_or(MusterError::Unauthorized)?;
        let valid = bcrypt::verify(password, hash)
            .map_err(|err| MusterError::ServerError(format!("Failed to verify password: {}", err)))?;
        if !valid {
            tracing::warn!("rejected staff login");
            return Err(MusterError::Unauthorized);
        }

        let token = Uuid::new_v4().to_string();
        store.insert_session(&token).await?;
        tracing::info!("staff session opened");

        Ok(token)
    }

    pub async fn logout(token: &str, store: &dyn Store) -> MusterResult<()> {
        store.remove_session(token).await
    }

    pub async fn verify(token: &str, store: &dyn Store) -> MusterResult<StaffCapability> {
        if store.session_exists(token).await? {
            Ok(StaffCapability { _private: () })
        } else {
            Err(MusterError::Unauthorized)
        }
    }

    /// Like [`Session::verify`], but a missing or unknown token is not an error.
    pub async fn verify_opt(
        token: Option<&str>,
        store: &dyn Store,
    ) -> MusterResult<Option<StaffCapability>> {
        match token {
            Some(token) if store.session_exists(token).await? => {
                Ok(Some(StaffCapability { _private: () }))
            }
            _ => Ok(None),
        }
    }
}
