use async_graphql::{Context, EmptySubscription, Request, Result, Schema};

use crate::db::{SharedStore, Store};
use crate::error::MusterError;
use crate::graphql::mutation::MutationRoot;
use crate::graphql::query::QueryRoot;
use crate::mirror::RosterMirror;
use crate::models::session::{Session, StaffCapability};

pub mod guards;
pub mod mutation;
pub mod query;

pub const SUCCESS_MESSAGE: &str = "success";

pub type MusterSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// The bcrypt hash staff log in against, if staff login is enabled.
#[derive(Clone, Debug)]
pub struct StaffPasswordHash(pub Option<String>);

/// The token the current request was made with.
#[derive(Clone, Debug)]
pub struct SessionToken(pub String);

pub fn build_schema(
    store: SharedStore,
    mirror: RosterMirror,
    staff_password_hash: Option<String>,
) -> MusterSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .data(mirror)
        .data(StaffPasswordHash(staff_password_hash))
        .finish()
}

/// Attaches the caller's staff session to the request, if the token is live.
pub async fn authorize(
    request: Request,
    token: Option<&str>,
    store: &dyn Store,
) -> crate::error::MusterResult<Request> {
    let request = match Session::verify_opt(token, store).await? {
        Some(staff) => request.data(staff),
        None => request,
    };

    Ok(match token {
        Some(token) => request.data(SessionToken(token.to_owned())),
        None => request,
    })
}

pub fn store_from_ctx<'c>(ctx: &Context<'c>) -> &'c dyn Store {
    ctx.data_unchecked::<SharedStore>().as_ref()
}

pub fn mirror_from_ctx<'c>(ctx: &Context<'c>) -> &'c RosterMirror {
    ctx.data_unchecked::<RosterMirror>()
}

pub fn staff_from_ctx<'c>(ctx: &Context<'c>) -> Result<&'c StaffCapability> {
    ctx.data_opt::<StaffCapability>()
        .ok_or_else(|| MusterError::Unauthorized.into())
}
