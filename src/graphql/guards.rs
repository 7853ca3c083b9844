use async_graphql::{Context, Guard, Result};

use crate::error::MusterError;
use crate::models::session::StaffCapability;

pub struct StaffOnly;

#[async_trait::async_trait]
impl Guard for StaffOnly {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        if ctx.data_opt::<StaffCapability>().is_some() {
            Ok(())
        } else {
            Err(MusterError::Unauthorized.into())
        }
    }
}
