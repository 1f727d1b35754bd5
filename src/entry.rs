//! Entry management for the finance tracking application.
//!
//! This module contains everything related to income and expense entries:
//! - The `Entry` model, its category tag, and the `EntryForm` input type
//! - Database functions for storing, querying, and managing entries
//! - Route handlers for the entry CRUD endpoints
//!
//! Every database function takes the owning user's ID and scopes its query by
//! it, entries are never visible across users.

use std::fmt::Display;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use rusqlite::{
    Connection, Row,
    types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::{AppState, Error, auth::Claims, database_id::DatabaseID, user::UserID};

// ============================================================================
// MODELS
// ============================================================================

/// Whether an entry records money earned or money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryCategory {
    /// Money earned, e.g. wages.
    Income,
    /// Money spent, e.g. groceries.
    Expense,
}

impl EntryCategory {
    /// The category tag as it appears on the wire and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryCategory::Income => "income",
            EntryCategory::Expense => "expense",
        }
    }
}

impl Display for EntryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for EntryCategory {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for EntryCategory {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "income" => Ok(EntryCategory::Income),
            "expense" => Ok(EntryCategory::Expense),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

/// An income or expense recorded by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// The ID of the entry.
    pub id: DatabaseID,
    /// The amount of money earned or spent.
    pub amount: f64,
    /// A text description of what the entry was for.
    pub description: String,
    /// When the money was earned or spent.
    pub date: DateTime<Utc>,
    /// Whether the entry is income or an expense.
    pub category: EntryCategory,
    /// The ID of the user that owns the entry.
    pub user_id: UserID,
}

/// The request body for creating or updating an entry.
///
/// The web client sends amounts and dates as strings, so both fields accept
/// either their native JSON type or a string form and fail the request with a
/// client error when the text cannot be converted.
#[derive(Debug, Deserialize)]
pub struct EntryForm {
    /// The value of the entry in dollars. Accepts a JSON number or a numeric
    /// string such as `"42.50"`.
    #[serde(deserialize_with = "amount_from_number_or_string")]
    pub amount: f64,
    /// Text detailing the entry.
    pub description: String,
    /// When the money was earned or spent. Accepts an RFC 3339 timestamp, a
    /// naive `YYYY-MM-DDTHH:MM:SS` timestamp (read as UTC), or a bare
    /// `YYYY-MM-DD` date (read as midnight UTC).
    #[serde(deserialize_with = "date_from_flexible_string")]
    pub date: DateTime<Utc>,
    /// Whether the entry is income or an expense.
    pub category: EntryCategory,
}

fn amount_from_number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AmountField {
        Number(f64),
        Text(String),
    }

    match AmountField::deserialize(deserializer)? {
        AmountField::Number(amount) => Ok(amount),
        AmountField::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("\"{text}\" is not a valid amount"))),
    }
}

fn date_from_flexible_string<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;

    parse_entry_date(&text).map_err(serde::de::Error::custom)
}

fn parse_entry_date(text: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Ok(date_time.with_timezone(&Utc));
    }

    if let Ok(date_time) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Ok(date_time.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }

    Err(format!("\"{text}\" is not a valid date"))
}

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// A route handler for creating a new entry owned by the caller.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn create_entry_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Json(form): Json<EntryForm>,
) -> Result<(StatusCode, Json<Entry>), Error> {
    let connection = state.db_connection().lock().unwrap();

    create_entry(form, claims.user_id, &connection).map(|entry| (StatusCode::CREATED, Json(entry)))
}

/// A route handler for listing all of the caller's entries.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_entries_endpoint(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Entry>>, Error> {
    let connection = state.db_connection().lock().unwrap();

    get_all_entries(claims.user_id, &connection).map(Json)
}

/// A route handler for listing the caller's entries within a calendar month.
///
/// `month` is 1-indexed; a month outside 1-12 is a client error.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_entries_by_month_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<Vec<Entry>>, Error> {
    let connection = state.db_connection().lock().unwrap();

    get_entries_in_month(year, month, claims.user_id, &connection).map(Json)
}

/// A route handler for getting one of the caller's entries by its ID.
///
/// This function will return the status code 404 if the entry does not exist
/// or belongs to another user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_entry_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(entry_id): Path<DatabaseID>,
) -> Result<Json<Entry>, Error> {
    let connection = state.db_connection().lock().unwrap();

    get_entry(entry_id, claims.user_id, &connection).map(Json)
}

/// A route handler for replacing the fields of one of the caller's entries.
///
/// This function will return the status code 404 if the entry does not exist
/// or belongs to another user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn update_entry_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(entry_id): Path<DatabaseID>,
    Json(form): Json<EntryForm>,
) -> Result<Json<Entry>, Error> {
    let connection = state.db_connection().lock().unwrap();

    update_entry(entry_id, claims.user_id, form, &connection).map(Json)
}

/// A route handler for deleting one of the caller's entries.
///
/// Responds with 204 No Content on success and 404 if the entry does not
/// exist or belongs to another user.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn delete_entry_endpoint(
    State(state): State<AppState>,
    claims: Claims,
    Path(entry_id): Path<DatabaseID>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection().lock().unwrap();

    delete_entry(entry_id, claims.user_id, &connection).map(|()| StatusCode::NO_CONTENT)
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the entry table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_entry_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS entry (
                id INTEGER PRIMARY KEY,
                amount REAL NOT NULL,
                description TEXT NOT NULL,
                date TEXT NOT NULL,
                category TEXT NOT NULL,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Format a timestamp the way the entry table stores it.
///
/// All dates are stored as RFC 3339 text at second precision with an explicit
/// UTC offset so that string comparison in SQL matches chronological order.
fn format_timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn map_entry_row(row: &Row) -> Result<Entry, rusqlite::Error> {
    Ok(Entry {
        id: row.get(0)?,
        amount: row.get(1)?,
        description: row.get(2)?,
        date: row.get(3)?,
        category: row.get(4)?,
        user_id: UserID::new(row.get(5)?),
    })
}

/// Create a new entry owned by `user_id` from the fields in `form`.
///
/// The entry's date is normalized to second precision UTC before persisting.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn create_entry(
    form: EntryForm,
    user_id: UserID,
    connection: &Connection,
) -> Result<Entry, Error> {
    connection
        .prepare(
            "INSERT INTO entry (amount, description, date, category, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             RETURNING id, amount, description, date, category, user_id",
        )?
        .query_row(
            (
                form.amount,
                &form.description,
                format_timestamp(&form.date),
                form.category,
                user_id.as_i64(),
            ),
            map_entry_row,
        )
        .map_err(|error| error.into())
}

/// Get the entry with `entry_id` owned by `user_id`.
///
/// # Errors
///
/// Returns an [Error::NotFound] if the entry does not exist or is owned by a
/// different user, or an [Error::SqlError] if an SQL related error occurred.
pub fn get_entry(
    entry_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<Entry, Error> {
    connection
        .prepare(
            "SELECT id, amount, description, date, category, user_id FROM entry
             WHERE id = ?1 AND user_id = ?2",
        )?
        .query_row((entry_id, user_id.as_i64()), map_entry_row)
        .map_err(|error| error.into())
}

/// Get all entries owned by `user_id` in store order.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_all_entries(user_id: UserID, connection: &Connection) -> Result<Vec<Entry>, Error> {
    connection
        .prepare("SELECT id, amount, description, date, category, user_id FROM entry WHERE user_id = ?1")?
        .query_map((user_id.as_i64(),), map_entry_row)?
        .map(|entry| entry.map_err(|error| error.into()))
        .collect()
}

/// Get the entries owned by `user_id` whose date falls within the calendar
/// month `year`-`month`.
///
/// `month` is 1-indexed. The range is the half-open interval from the first
/// day of the month (inclusive) to the first day of the next month
/// (exclusive).
///
/// # Errors
///
/// Returns an [Error::InvalidDate] if `year` and `month` do not name a valid
/// calendar month, or an [Error::SqlError] if an SQL related error occurred.
pub fn get_entries_in_month(
    year: i32,
    month: u32,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Entry>, Error> {
    let (start, end) = month_range(year, month)?;

    connection
        .prepare(
            "SELECT id, amount, description, date, category, user_id FROM entry
             WHERE user_id = ?1 AND date >= ?2 AND date < ?3",
        )?
        .query_map(
            (
                user_id.as_i64(),
                format_timestamp(&start),
                format_timestamp(&end),
            ),
            map_entry_row,
        )?
        .map(|entry| entry.map_err(|error| error.into()))
        .collect()
}

/// Get the entries owned by `user_id` dated on or after `start`, ordered by
/// category ascending.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_entries_since(
    start: DateTime<Utc>,
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Entry>, Error> {
    connection
        .prepare(
            "SELECT id, amount, description, date, category, user_id FROM entry
             WHERE user_id = ?1 AND date >= ?2
             ORDER BY category ASC",
        )?
        .query_map((user_id.as_i64(), format_timestamp(&start)), map_entry_row)?
        .map(|entry| entry.map_err(|error| error.into()))
        .collect()
}

/// Get the `limit` most recently dated entries owned by `user_id`, date
/// descending.
///
/// # Errors
/// Returns an [Error::SqlError] if an SQL related error occurred.
pub fn get_recent_entries(
    user_id: UserID,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Entry>, Error> {
    connection
        .prepare(
            "SELECT id, amount, description, date, category, user_id FROM entry
             WHERE user_id = ?1
             ORDER BY date DESC
             LIMIT ?2",
        )?
        .query_map((user_id.as_i64(), limit), map_entry_row)?
        .map(|entry| entry.map_err(|error| error.into()))
        .collect()
}

/// Replace the amount, description, date, and category of the entry with
/// `entry_id` owned by `user_id`.
///
/// # Errors
///
/// Returns an [Error::UpdateMissingEntry] if the entry does not exist or is
/// owned by a different user, or an [Error::SqlError] if an SQL related error
/// occurred.
pub fn update_entry(
    entry_id: DatabaseID,
    user_id: UserID,
    form: EntryForm,
    connection: &Connection,
) -> Result<Entry, Error> {
    connection
        .prepare(
            "UPDATE entry SET amount = ?1, description = ?2, date = ?3, category = ?4
             WHERE id = ?5 AND user_id = ?6
             RETURNING id, amount, description, date, category, user_id",
        )?
        .query_row(
            (
                form.amount,
                &form.description,
                format_timestamp(&form.date),
                form.category,
                entry_id,
                user_id.as_i64(),
            ),
            map_entry_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingEntry,
            error => error.into(),
        })
}

/// Delete the entry with `entry_id` owned by `user_id`.
///
/// # Errors
///
/// Returns an [Error::DeleteMissingEntry] if the entry does not exist or is
/// owned by a different user, or an [Error::SqlError] if an SQL related error
/// occurred.
pub fn delete_entry(
    entry_id: DatabaseID,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_deleted = connection.execute(
        "DELETE FROM entry WHERE id = ?1 AND user_id = ?2",
        (entry_id, user_id.as_i64()),
    )?;

    if rows_deleted == 0 {
        Err(Error::DeleteMissingEntry)
    } else {
        Ok(())
    }
}

fn month_range(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>), Error> {
    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::InvalidDate(format!("{year}-{month} is not a valid year and month")))?;

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .ok_or_else(|| Error::InvalidDate(format!("{year}-{month} is not a valid year and month")))?;

    Ok((
        start.and_time(NaiveTime::MIN).and_utc(),
        end.and_time(NaiveTime::MIN).and_utc(),
    ))
}
