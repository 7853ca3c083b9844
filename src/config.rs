//! Runtime settings, read from the environment (and a `.env` file if present).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};

pub const DEFAULT_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_ROSTER_CSV: &str = "roster.csv";
const STAFF_HASH_COST: u32 = bcrypt::DEFAULT_COST;

#[derive(Clone, Debug)]
pub struct Config {
    /// Where to find Postgres. Without one, everything lives in memory.
    pub database_url: Option<String>,
    pub addr: SocketAddr,
    /// Bcrypt hash of the shared staff password. Staff login is disabled
    /// when unset.
    pub staff_password_hash: Option<String>,
    pub roster_csv: PathBuf,
    pub seed_default_events: bool,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let addr = var("MUSTER_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_owned());
        let addr = addr
            .parse()
            .with_context(|| format!("MUSTER_ADDR is not a socket address: {}", addr))?;

        let staff_password_hash = match (var("STAFF_PASSWORD_HASH"), var("STAFF_PASSWORD")) {
            (Some(hash), _) => Some(hash),
            (None, Some(password)) => Some(
                bcrypt::hash(password, STAFF_HASH_COST)
                    .context("Failed to hash STAFF_PASSWORD")?,
            ),
            (None, None) => None,
        };

        let seed_default_events = match var("SEED_DEFAULT_EVENTS").as_deref() {
            None => false,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => bail!("SEED_DEFAULT_EVENTS must be true or false, got {}", other),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            addr,
            staff_password_hash,
            roster_csv: var("ROSTER_CSV")
                .unwrap_or_else(|| DEFAULT_ROSTER_CSV.to_owned())
                .into(),
            seed_default_events,
        })
    }
}
