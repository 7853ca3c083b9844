//! Small helpers shared across the models.

use std::sync::OnceLock;

use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};

use crate::error::{MusterError, MusterResult};

/// How event and excusal dates are written and parsed.
pub const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Reads the host's UTC offset and keeps it for `current_date`.
///
/// Must run before any other threads exist; once the runtime is up the
/// offset can't be read safely and dates fall back to UTC.
pub fn init_local_offset() -> Option<UtcOffset> {
    let offset = UtcOffset::current_local_offset().ok()?;
    Some(*LOCAL_OFFSET.get_or_init(|| offset))
}

pub fn current_date() -> Date {
    let offset = LOCAL_OFFSET.get().copied().unwrap_or(UtcOffset::UTC);
    date_at(OffsetDateTime::now_utc(), offset)
}

/// The calendar date at `now` for someone at `offset`.
pub fn date_at(now: OffsetDateTime, offset: UtcOffset) -> Date {
    now.to_offset(offset).date()
}

/// Today's date as `YYYY-MM-DD`.
pub fn today() -> MusterResult<String> {
    format_date(current_date())
}

pub fn format_date(date: Date) -> MusterResult<String> {
    date.format(DATE_FORMAT)
        .map_err(|err| MusterError::ServerError(format!("Failed to format date: {}", err)))
}

/// Checks that `date` is a zero-padded ISO 8601 calendar date.
///
/// Event and excusal dates are stored as text and compared lexically, which
/// is only sound for this exact shape.
pub fn ensure_iso_date(date: &str) -> MusterResult<()> {
    let date = date.trim();
    if date.len() != 10 {
        return Err(MusterError::InvalidDate(date.to_owned()));
    }

    Date::parse(date, DATE_FORMAT)
        .map(|_| ())
        .map_err(|_| MusterError::InvalidDate(date.to_owned()))
}

/// The form used for case-insensitive name matching.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

pub fn names_match(first: &str, second: &str) -> bool {
    normalize_name(first) == normalize_name(second)
}
