//! Attendance and excusal tracking for a cadet detachment.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use muster::config::Config;
use muster::db::{MemoryStore, PgStore, SharedStore};
use muster::mirror::RosterMirror;
use muster::models::cadet::Cadet;
use muster::models::event::Event;
use muster::server;
use muster::util;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("muster=info")),
        )
        .init();

    // the local offset can only be read while this is the only thread
    match util::init_local_offset() {
        Some(offset) => tracing::info!(%offset, "using local time for dates"),
        None => tracing::warn!("couldn't read the local UTC offset, dates are in UTC"),
    }

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?
        .block_on(serve())
}

async fn serve() -> anyhow::Result<()> {
    let config = Config::load()?;
    let store: SharedStore = match &config.database_url {
        Some(db_url) => Arc::new(
            PgStore::connect(db_url)
                .await
                .context("Failed to connect to the database")?,
        ),
        None => {
            tracing::warn!("DATABASE_URL not set, keeping everything in memory");
            Arc::new(MemoryStore::new())
        }
    };
    if config.staff_password_hash.is_none() {
        tracing::warn!("no staff password configured, staff login is disabled");
    }

    let mirror = RosterMirror::new(&config.roster_csv);
    let seeded = Cadet::seed_from_mirror(&mirror, store.as_ref())
        .await
        .context("Failed to seed the roster")?;
    if seeded > 0 {
        tracing::info!(seeded, path = %mirror.path().display(), "seeded roster from file");
    }
    if config.seed_default_events {
        Event::seed_defaults(store.as_ref())
            .await
            .context("Failed to seed default events")?;
    }

    let app = server::app(store, mirror, config.staff_password_hash.clone());
    tracing::info!(addr = %config.addr, "listening");
    axum::Server::bind(&config.addr)
        .serve(app.into_make_service())
        .await
        .context("Server error")?;

    Ok(())
}
