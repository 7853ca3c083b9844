//! Error handling for the service.
//!
//! Prefer adding a variant to [`MusterError`] over squeezing a failure into
//! `BadRequest`. Each variant documents the status code it maps to.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use crate::models::event::excusal::ExcusalStatus;

/// The error enum for all error handling across the service.
#[derive(Debug, thiserror::Error)]
pub enum MusterError {
    /// \[409\] A cadet with the same name (ignoring case) is already on the roster.
    #[error("a cadet named {0} already exists")]
    DuplicateCadet(String),
    /// \[404\] No cadet on the roster matches the given name or id.
    #[error("no cadet found matching {0}")]
    CadetNotFound(String),
    /// \[404\] No event has the given id.
    #[error("no event with id {0}")]
    EventNotFound(i64),
    /// \[404\] No excusal has the given id.
    #[error("no excusal with id {0}")]
    ExcusalNotFound(i64),
    /// \[409\] The excusal is not in a state that allows the requested change.
    #[error("excusal {id} cannot go from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: ExcusalStatus,
        to: ExcusalStatus,
    },
    /// \[500\] The roster CSV mirror could not be written.
    ///
    /// Never returned from a roster mutation; it is reported next to the
    /// committed result as a warning.
    #[error("failed to sync roster mirror: {0}")]
    MirrorSync(String),
    /// \[400\] A date was not an ISO 8601 calendar date.
    #[error("invalid date {0:?}, expected YYYY-MM-DD")]
    InvalidDate(String),
    /// \[400\] The request was malformed.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// \[401\] The operation requires a staff session.
    #[error("staff login required")]
    Unauthorized,
    /// \[500\] An error occurred while talking to the database.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// \[500\] The database schema could not be migrated.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    /// \[500\] A CSV document could not be read or written.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// \[500\] An unexpected server-side failure.
    #[error("server error: {0}")]
    ServerError(String),
}

/// The return type for all fallible operations.
pub type MusterResult<T> = Result<T, MusterError>;

impl MusterError {
    pub fn status(&self) -> u16 {
        match self {
            MusterError::BadRequest(_) | MusterError::InvalidDate(_) => 400,
            MusterError::Unauthorized => 401,
            MusterError::CadetNotFound(_)
            | MusterError::EventNotFound(_)
            | MusterError::ExcusalNotFound(_) => 404,
            MusterError::DuplicateCadet(_) | MusterError::InvalidTransition { .. } => 409,
            MusterError::MirrorSync(_)
            | MusterError::Database(_)
            | MusterError::Migration(_)
            | MusterError::Csv(_)
            | MusterError::ServerError(_) => 500,
        }
    }

    pub fn as_response(&self) -> (u16, Value) {
        let mut json_val = match self {
            MusterError::DuplicateCadet(name) => json!({ "name": name }),
            MusterError::CadetNotFound(name) => json!({ "cadet": name }),
            MusterError::EventNotFound(id) => json!({ "eventId": id }),
            MusterError::ExcusalNotFound(id) => json!({ "excusalId": id }),
            MusterError::InvalidTransition { id, from, to } => json!({
                "excusalId": id,
                "from": from.as_str(),
                "to": to.as_str(),
            }),
            MusterError::BadRequest(reason) | MusterError::InvalidDate(reason) => {
                json!({ "reason": reason })
            }
            MusterError::Unauthorized => json!({}),
            MusterError::MirrorSync(error) | MusterError::ServerError(error) => {
                json!({ "error": error })
            }
            MusterError::Database(error) => json!({ "error": error.to_string() }),
            MusterError::Migration(error) => json!({ "error": error.to_string() }),
            MusterError::Csv(error) => json!({ "error": error.to_string() }),
        };

        let status_code = self.status();
        json_val["statusCode"] = json!(status_code);
        json_val["message"] = json!(self.to_string());

        (status_code, json_val)
    }
}

impl IntoResponse for MusterError {
    fn into_response(self) -> Response {
        let (status, body) = self.as_response();
        if status >= 500 {
            tracing::error!(error = %self, "request failed");
        }

        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
