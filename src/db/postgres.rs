use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::db::{Change, Store};
use crate::error::{MusterError, MusterResult};
use crate::models::cadet::{Cadet, CadetStatus};
use crate::models::event::attendance_override::AttendanceOverride;
use crate::models::event::excusal::{Excusal, ExcusalStatus, NewExcusal};
use crate::models::event::Event;

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";

const CADET_COLUMNS: &str = "id, name, rank, status";
const EVENT_COLUMNS: &str = "id, name, \"date\"";
const EXCUSAL_COLUMNS: &str = "id, \"date\", cadet_id, name, event, reason, makeup_plan, poc, \
                               position, cpt, company, phone, email, status";
const OVERRIDE_COLUMNS: &str = "id, cadet_id, event_id, status";

/// A [`Store`] backed by Postgres.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and brings the schema up to date.
    pub async fn connect(db_url: &str) -> MusterResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }
}

fn parse_column<T>(column: &str, value: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = MusterError>,
{
    value
        .parse()
        .map_err(|err: MusterError| sqlx::Error::ColumnDecode {
            index: column.to_owned(),
            source: Box::new(err),
        })
}

fn cadet_from_row(row: PgRow) -> Result<Cadet, sqlx::Error> {
    let status: String = row.try_get("status")?;

    Ok(Cadet {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        rank: row.try_get("rank")?,
        status: parse_column("status", &status)?,
    })
}

fn event_from_row(row: PgRow) -> Result<Event, sqlx::Error> {
    Ok(Event {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        date: row.try_get("date")?,
    })
}

fn excusal_from_row(row: PgRow) -> Result<Excusal, sqlx::Error> {
    let status: String = row.try_get("status")?;

    Ok(Excusal {
        id: row.try_get("id")?,
        date: row.try_get("date")?,
        cadet_id: row.try_get("cadet_id")?,
        name: row.try_get("name")?,
        event: row.try_get("event")?,
        reason: row.try_get("reason")?,
        makeup_plan: row.try_get("makeup_plan")?,
        poc: row.try_get("poc")?,
        position: row.try_get("position")?,
        cpt: row.try_get("cpt")?,
        company: row.try_get("company")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        status: parse_column("status", &status)?,
    })
}

fn override_from_row(row: PgRow) -> Result<AttendanceOverride, sqlx::Error> {
    Ok(AttendanceOverride {
        id: row.try_get("id")?,
        cadet_id: row.try_get("cadet_id")?,
        event_id: row.try_get("event_id")?,
        status: row.try_get("status")?,
    })
}

fn violates(error: &sqlx::Error, code: &str) -> bool {
    match error {
        sqlx::Error::Database(db_error) => db_error.code().as_deref() == Some(code),
        _ => false,
    }
}

fn map_rows<T>(
    rows: Vec<PgRow>,
    from_row: fn(PgRow) -> Result<T, sqlx::Error>,
) -> MusterResult<Vec<T>> {
    rows.into_iter()
        .map(from_row)
        .collect::<Result<Vec<_>, _>>()
        .map_err(Into::into)
}

#[async_trait]
impl Store for PgStore {
    async fn cadets(&self) -> MusterResult<Vec<Cadet>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM cadet ORDER BY LOWER(name), name, id",
            CADET_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows, cadet_from_row)
    }

    async fn cadet(&self, id: i64) -> MusterResult<Option<Cadet>> {
        let row = sqlx::query(&format!("SELECT {} FROM cadet WHERE id = $1", CADET_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(cadet_from_row).transpose().map_err(Into::into)
    }

    async fn insert_cadet(&self, name: &str, rank: Option<&str>) -> MusterResult<Cadet> {
        let row = sqlx::query(&format!(
            "INSERT INTO cadet (name, rank) VALUES ($1, $2) RETURNING {}",
            CADET_COLUMNS
        ))
        .bind(name)
        .bind(rank)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if violates(&err, UNIQUE_VIOLATION) {
                MusterError::DuplicateCadet(name.to_owned())
            } else {
                err.into()
            }
        })?;

        cadet_from_row(row).map_err(Into::into)
    }

    async fn update_cadet(&self, cadet: &Cadet) -> MusterResult<()> {
        let result = sqlx::query("UPDATE cadet SET name = $1, rank = $2, status = $3 WHERE id = $4")
            .bind(&cadet.name)
            .bind(&cadet.rank)
            .bind(cadet.status.as_str())
            .bind(cadet.id)
            .execute(&self.pool)
            .await
            .map_err(|err| {
                if violates(&err, UNIQUE_VIOLATION) {
                    MusterError::DuplicateCadet(cadet.name.clone())
                } else {
                    err.into()
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(MusterError::CadetNotFound(format!("id {}", cadet.id)));
        }

        Ok(())
    }

    async fn delete_cadet(&self, id: i64) -> MusterResult<Option<Cadet>> {
        let row = sqlx::query(&format!(
            "DELETE FROM cadet WHERE id = $1 RETURNING {}",
            CADET_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(cadet_from_row).transpose().map_err(Into::into)
    }

    async fn events(&self) -> MusterResult<Vec<Event>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM event ORDER BY \"date\", id",
            EVENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows, event_from_row)
    }

    async fn event(&self, id: i64) -> MusterResult<Option<Event>> {
        let row = sqlx::query(&format!("SELECT {} FROM event WHERE id = $1", EVENT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(event_from_row).transpose().map_err(Into::into)
    }

    async fn insert_event(&self, name: &str, date: &str) -> MusterResult<Event> {
        let row = sqlx::query(&format!(
            "INSERT INTO event (name, \"date\") VALUES ($1, $2) RETURNING {}",
            EVENT_COLUMNS
        ))
        .bind(name)
        .bind(date)
        .fetch_one(&self.pool)
        .await?;

        event_from_row(row).map_err(Into::into)
    }

    async fn excusals(&self) -> MusterResult<Vec<Excusal>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM excusal ORDER BY \"date\", id",
            EXCUSAL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows, excusal_from_row)
    }

    async fn excusal(&self, id: i64) -> MusterResult<Option<Excusal>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM excusal WHERE id = $1",
            EXCUSAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(excusal_from_row).transpose().map_err(Into::into)
    }

    async fn excusals_for_event(&self, event_name: &str) -> MusterResult<Vec<Excusal>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM excusal WHERE event = $1 ORDER BY \"date\", id",
            EXCUSAL_COLUMNS
        ))
        .bind(event_name)
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows, excusal_from_row)
    }

    async fn submit_excusal(&self, new_excusal: &NewExcusal) -> MusterResult<Excusal> {
        let mut transaction = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "INSERT INTO excusal \
             (\"date\", cadet_id, name, event, reason, makeup_plan, poc, position, cpt, company, \
              phone, email, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            EXCUSAL_COLUMNS
        ))
        .bind(&new_excusal.date)
        .bind(new_excusal.cadet_id)
        .bind(&new_excusal.name)
        .bind(&new_excusal.event)
        .bind(&new_excusal.reason)
        .bind(&new_excusal.makeup_plan)
        .bind(&new_excusal.poc)
        .bind(&new_excusal.position)
        .bind(&new_excusal.cpt)
        .bind(&new_excusal.company)
        .bind(&new_excusal.phone)
        .bind(&new_excusal.email)
        .bind(ExcusalStatus::Pending.as_str())
        .fetch_one(&mut transaction)
        .await
        .map_err(|err| match new_excusal.cadet_id {
            Some(cadet_id) if violates(&err, FOREIGN_KEY_VIOLATION) => {
                MusterError::CadetNotFound(format!("id {}", cadet_id))
            }
            _ => err.into(),
        })?;
        let excusal = excusal_from_row(row)?;

        if let Some(cadet_id) = new_excusal.cadet_id {
            let result = sqlx::query("UPDATE cadet SET status = $1 WHERE id = $2")
                .bind(CadetStatus::Pending.as_str())
                .bind(cadet_id)
                .execute(&mut transaction)
                .await?;
            if result.rows_affected() == 0 {
                return Err(MusterError::CadetNotFound(format!("id {}", cadet_id)));
            }
        }

        transaction.commit().await?;
        Ok(excusal)
    }

    async fn update_excusal(&self, excusal: &Excusal) -> MusterResult<()> {
        let result = sqlx::query(
            "UPDATE excusal SET \"date\" = $1, cadet_id = $2, name = $3, event = $4, reason = $5, \
             makeup_plan = $6, poc = $7, position = $8, cpt = $9, company = $10, phone = $11, \
             email = $12 \
             WHERE id = $13",
        )
        .bind(&excusal.date)
        .bind(excusal.cadet_id)
        .bind(&excusal.name)
        .bind(&excusal.event)
        .bind(&excusal.reason)
        .bind(&excusal.makeup_plan)
        .bind(&excusal.poc)
        .bind(&excusal.position)
        .bind(&excusal.cpt)
        .bind(&excusal.company)
        .bind(&excusal.phone)
        .bind(&excusal.email)
        .bind(excusal.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MusterError::ExcusalNotFound(excusal.id));
        }

        Ok(())
    }

    async fn override_for(
        &self,
        cadet_id: i64,
        event_id: i64,
    ) -> MusterResult<Option<AttendanceOverride>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM attendance_override WHERE cadet_id = $1 AND event_id = $2",
            OVERRIDE_COLUMNS
        ))
        .bind(cadet_id)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(override_from_row).transpose().map_err(Into::into)
    }

    async fn overrides_for_event(&self, event_id: i64) -> MusterResult<Vec<AttendanceOverride>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM attendance_override WHERE event_id = $1",
            OVERRIDE_COLUMNS
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        map_rows(rows, override_from_row)
    }

    async fn upsert_override(
        &self,
        cadet_id: i64,
        event_id: i64,
        status: &str,
    ) -> MusterResult<AttendanceOverride> {
        let row = sqlx::query(&format!(
            "INSERT INTO attendance_override (cadet_id, event_id, status) VALUES ($1, $2, $3) \
             ON CONFLICT (cadet_id, event_id) DO UPDATE SET status = EXCLUDED.status \
             RETURNING {}",
            OVERRIDE_COLUMNS
        ))
        .bind(cadet_id)
        .bind(event_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            if violates(&err, FOREIGN_KEY_VIOLATION) {
                MusterError::BadRequest(format!(
                    "no cadet {} or event {} to override",
                    cadet_id, event_id
                ))
            } else {
                err.into()
            }
        })?;

        override_from_row(row).map_err(Into::into)
    }

    async fn commit(&self, changes: &[Change]) -> MusterResult<()> {
        let mut transaction = self.pool.begin().await?;

        for change in changes {
            match *change {
                Change::ExcusalStatus { id, from, to } => {
                    let result =
                        sqlx::query("UPDATE excusal SET status = $1 WHERE id = $2 AND status = $3")
                            .bind(to.as_str())
                            .bind(id)
                            .bind(from.as_str())
                            .execute(&mut transaction)
                            .await?;
                    if result.rows_affected() == 0 {
                        let current: Option<String> =
                            sqlx::query_scalar("SELECT status FROM excusal WHERE id = $1")
                                .bind(id)
                                .fetch_optional(&mut transaction)
                                .await?;
                        return Err(match current {
                            Some(current) => MusterError::InvalidTransition {
                                id,
                                from: parse_column("status", &current)?,
                                to,
                            },
                            None => MusterError::ExcusalNotFound(id),
                        });
                    }
                }
                Change::CadetStatus { id, status } => {
                    let result = sqlx::query("UPDATE cadet SET status = $1 WHERE id = $2")
                        .bind(status.as_str())
                        .bind(id)
                        .execute(&mut transaction)
                        .await?;
                    if result.rows_affected() == 0 {
                        return Err(MusterError::CadetNotFound(format!("id {}", id)));
                    }
                }
            }
        }

        transaction.commit().await?;
        Ok(())
    }

    async fn insert_session(&self, token: &str) -> MusterResult<()> {
        sqlx::query("INSERT INTO staff_session (token) VALUES ($1)")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn session_exists(&self, token: &str) -> MusterResult<bool> {
        let found: Option<String> =
            sqlx::query_scalar("SELECT token FROM staff_session WHERE token = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    async fn remove_session(&self, token: &str) -> MusterResult<()> {
        sqlx::query("DELETE FROM staff_session WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
