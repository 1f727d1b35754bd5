//! This file defines the dashboard routes and their handlers.
//!
//! The dashboard summarises the caller's current calendar month: entries are
//! partitioned into income and expenses and each side is totalled. The month
//! window is computed in UTC, matching how entry dates are stored.

use axum::{Json, extract::State};
use chrono::{DateTime, Datelike, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::Claims,
    entry::{Entry, EntryCategory, get_entries_since, get_recent_entries},
};

/// The number of entries returned by the recent entries endpoint.
const RECENT_ENTRY_COUNT: u32 = 3;

/// The totals and entry lists for the client's dashboard and chart views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    /// The sum of the caller's income entries for the current month.
    pub current_month_income_total: f64,
    /// The sum of the caller's expense entries for the current month.
    pub current_month_expense_total: f64,
    /// The caller's expense entries for the current month.
    pub current_month_expenses: Vec<Entry>,
    /// The caller's income entries for the current month.
    pub current_month_income: Vec<Entry>,
    /// All of the caller's entries for the current month, ordered by category.
    pub current_month_entries: Vec<Entry>,
}

/// A route handler for the dashboard summary of the current calendar month.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_dashboard_data(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<DashboardData>, Error> {
    let month_start = current_month_start(Utc::now());

    let connection = state.db_connection().lock().unwrap();
    let entries = get_entries_since(month_start, claims.user_id, &connection)?;

    Ok(Json(summarize_entries(entries)))
}

/// A route handler for the caller's three most recently dated entries.
///
/// # Panics
///
/// Panics if the lock for the database connection is already held by the same thread.
pub async fn get_recent_entries_endpoint(
    State(state): State<AppState>,
    claims: Claims,
) -> Result<Json<Vec<Entry>>, Error> {
    let connection = state.db_connection().lock().unwrap();

    get_recent_entries(claims.user_id, RECENT_ENTRY_COUNT, &connection).map(Json)
}

fn summarize_entries(entries: Vec<Entry>) -> DashboardData {
    let (income, expenses): (Vec<Entry>, Vec<Entry>) = entries
        .iter()
        .cloned()
        .partition(|entry| entry.category == EntryCategory::Income);

    DashboardData {
        current_month_income_total: income.iter().map(|entry| entry.amount).sum(),
        current_month_expense_total: expenses.iter().map(|entry| entry.amount).sum(),
        current_month_expenses: expenses,
        current_month_income: income,
        current_month_entries: entries,
    }
}

fn current_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .expect("the first day of the current month is always a valid date")
        .and_time(NaiveTime::MIN)
        .and_utc()
}
