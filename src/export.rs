//! CSV downloads of the roster, the excusal log, and an event's attendance.
//!
//! These are read-only projections. The attendance export is built from the
//! same [`AttendanceSheet`] as the live view.

use crate::db::Store;
use crate::error::{MusterError, MusterResult};
use crate::models::cadet::Cadet;
use crate::models::event::attendance::AttendanceSheet;
use crate::models::event::excusal::Excusal;
use crate::models::event::Event;
use crate::models::session::StaffCapability;

pub const ROSTER_HEADER: [&str; 3] = ["name", "rank", "status"];
pub const EXCUSAL_HEADER: [&str; 8] = [
    "id", "date", "name", "event", "reason", "status", "email", "phone",
];
pub const ATTENDANCE_HEADER: [&str; 5] =
    ["name", "rank", "status", "excusal_date", "excusal_reason"];

/// A rendered CSV document and the file name to offer it under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub body: String,
}

fn render<I, R>(header: &[&str], rows: I) -> MusterResult<String>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator,
    R::Item: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| MusterError::ServerError(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| MusterError::ServerError(err.to_string()))
}

pub fn roster_csv(cadets: &[Cadet]) -> MusterResult<String> {
    render(
        &ROSTER_HEADER,
        cadets.iter().map(|cadet| {
            [
                cadet.name.clone(),
                cadet.rank.clone().unwrap_or_default(),
                cadet.status.to_string(),
            ]
        }),
    )
}

pub fn excusals_csv(excusals: &[Excusal]) -> MusterResult<String> {
    render(
        &EXCUSAL_HEADER,
        excusals.iter().map(|excusal| {
            [
                excusal.id.to_string(),
                excusal.date.clone(),
                excusal.name.clone(),
                excusal.event.clone(),
                excusal.reason.clone(),
                excusal.status.to_string(),
                excusal.email.clone(),
                excusal.phone.clone(),
            ]
        }),
    )
}

pub fn attendance_csv(sheet: &AttendanceSheet) -> MusterResult<String> {
    render(
        &ATTENDANCE_HEADER,
        sheet.rows.iter().map(|row| {
            let (excusal_date, excusal_reason) = row
                .excusal
                .as_ref()
                .map(|excusal| (excusal.date.clone(), excusal.reason.clone()))
                .unwrap_or_default();

            [
                row.cadet.name.clone(),
                row.cadet.rank.clone().unwrap_or_default(),
                row.status.to_string(),
                excusal_date,
                excusal_reason,
            ]
        }),
    )
}

pub fn attendance_file_name(event: &Event) -> String {
    format!("attendance_{}_{}.csv", event.name.replace(' ', "_"), event.date)
}

pub async fn export_roster(_staff: &StaffCapability, store: &dyn Store) -> MusterResult<CsvExport> {
    let cadets = Cadet::all(store).await?;

    Ok(CsvExport {
        file_name: "roster.csv".to_owned(),
        body: roster_csv(&cadets)?,
    })
}

pub async fn export_excusals(
    _staff: &StaffCapability,
    store: &dyn Store,
) -> MusterResult<CsvExport> {
    let excusals = Excusal::all(store).await?;

    Ok(CsvExport {
        file_name: "excusals.csv".to_owned(),
        body: excusals_csv(&excusals)?,
    })
}

/// Fails with `EventNotFound` for an unknown event id.
pub async fn export_attendance(
    event_id: i64,
    _staff: &StaffCapability,
    store: &dyn Store,
) -> MusterResult<CsvExport> {
    let sheet = AttendanceSheet::for_event_id(event_id, store).await?;

    Ok(CsvExport {
        file_name: attendance_file_name(&sheet.event),
        body: attendance_csv(&sheet)?,
    })
}
