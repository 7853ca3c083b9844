//! Roster, excusal, and attendance tracking for a cadet detachment.

pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod graphql;
pub mod mirror;
pub mod models;
pub mod server;
pub mod util;
