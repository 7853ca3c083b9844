//! The HTTP surface: the GraphQL endpoint, CSV downloads, and a health check.

use async_graphql::http::{playground_source, GraphQLPlaygroundConfig};
use async_graphql::{Request, Response as GraphQLResponse};
use axum::extract::{Extension, Query};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::db::SharedStore;
use crate::error::{MusterError, MusterResult};
use crate::export::{self, CsvExport};
use crate::graphql::{authorize, build_schema, MusterSchema};
use crate::mirror::RosterMirror;
use crate::models::session::{Session, StaffCapability};

/// The header staff tokens travel in.
pub const MUSTER_TOKEN: &str = "MUSTER_TOKEN";

#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub schema: MusterSchema,
}

pub fn app(store: SharedStore, mirror: RosterMirror, staff_password_hash: Option<String>) -> Router {
    let schema = build_schema(store.clone(), mirror, staff_password_hash);

    Router::new()
        .route("/graphql", get(playground).post(graphql))
        .route("/export/roster.csv", get(roster_csv))
        .route("/export/excusals.csv", get(excusals_csv))
        .route("/export/attendance.csv", get(attendance_csv))
        .route("/_health", get(health))
        .layer(Extension(AppState { store, schema }))
        .layer(CorsLayer::permissive())
}

async fn graphql(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Json(request): Json<Request>,
) -> MusterResult<Json<GraphQLResponse>> {
    let token = get_token(&headers)?;
    let request = authorize(request, token, state.store.as_ref()).await?;

    Ok(Json(state.schema.execute(request).await))
}

async fn playground(headers: HeaderMap) -> MusterResult<Html<String>> {
    let mut config = GraphQLPlaygroundConfig::new("/graphql");
    if let Some(token) = get_token(&headers)? {
        config = config.with_header(MUSTER_TOKEN, token);
    }

    Ok(Html(playground_source(config)))
}

async fn health() -> &'static str {
    "OK"
}

async fn roster_csv(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> MusterResult<Response> {
    let staff = require_staff(&headers, &state).await?;
    let export = export::export_roster(&staff, state.store.as_ref()).await?;

    Ok(csv_response(export))
}

async fn excusals_csv(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
) -> MusterResult<Response> {
    let staff = require_staff(&headers, &state).await?;
    let export = export::export_excusals(&staff, state.store.as_ref()).await?;

    Ok(csv_response(export))
}

#[derive(Deserialize)]
struct AttendanceQuery {
    event_id: i64,
}

async fn attendance_csv(
    Extension(state): Extension<AppState>,
    headers: HeaderMap,
    Query(query): Query<AttendanceQuery>,
) -> MusterResult<Response> {
    let staff = require_staff(&headers, &state).await?;
    let export = export::export_attendance(query.event_id, &staff, state.store.as_ref()).await?;

    Ok(csv_response(export))
}

fn csv_response(export: CsvExport) -> Response {
    (
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.file_name),
            ),
        ],
        export.body,
    )
        .into_response()
}

async fn require_staff(headers: &HeaderMap, state: &AppState) -> MusterResult<StaffCapability> {
    let token = get_token(headers)?.ok_or(MusterError::Unauthorized)?;
    Session::verify(token, state.store.as_ref()).await
}

fn get_token(headers: &HeaderMap) -> MusterResult<Option<&str>> {
    headers
        .iter()
        .find_map(|(name, value)| {
            if name == MUSTER_TOKEN {
                Some(value.to_str().map_err(|_| {
                    MusterError::BadRequest(format!("{} header is not valid text", MUSTER_TOKEN))
                }))
            } else {
                None
            }
        })
        .transpose()
}
