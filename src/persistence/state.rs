use super::store::{load_record, save_record, KeyValueStore};
use crate::domain::ActiveSession;
use crate::report::TetherSummary;
use anyhow::Result;
use chrono::NaiveDate;
use tracing::warn;

pub const ACTIVE_SESSION_KEY: &str = "active_session";
pub const HISTORY_KEY: &str = "history";

/// Load the persisted session. Malformed or inconsistent records are removed.
pub fn load_active_session<S: KeyValueStore + ?Sized>(store: &S) -> Result<Option<ActiveSession>> {
    match load_record::<S, ActiveSession>(store, ACTIVE_SESSION_KEY) {
        Some(session) if session.is_consistent() => Ok(Some(session)),
        Some(session) => {
            warn!(tether = %session.name, "discarding inconsistent session record");
            store.remove(ACTIVE_SESSION_KEY)?;
            Ok(None)
        }
        // Missing, or already logged by load_record
        None => {
            store.remove(ACTIVE_SESSION_KEY)?;
            Ok(None)
        }
    }
}

/// Persist the session, or clear it when there is none
pub fn save_active_session<S: KeyValueStore + ?Sized>(
    store: &S,
    session: Option<&ActiveSession>,
) -> Result<()> {
    match session {
        Some(session) => save_record(store, ACTIVE_SESSION_KEY, session),
        None => store.remove(ACTIVE_SESSION_KEY),
    }
}

/// All finished sessions, oldest first
pub fn load_history<S: KeyValueStore + ?Sized>(store: &S) -> Vec<TetherSummary> {
    load_record(store, HISTORY_KEY).unwrap_or_default()
}

pub fn append_summary<S: KeyValueStore + ?Sized>(store: &S, summary: &TetherSummary) -> Result<()> {
    let mut history = load_history(store);
    history.push(summary.clone());
    save_record(store, HISTORY_KEY, &history)
}

/// Finished sessions for one local date
pub fn history_for_date<S: KeyValueStore + ?Sized>(store: &S, date: NaiveDate) -> Vec<TetherSummary> {
    load_history(store)
        .into_iter()
        .filter(|summary| summary.date == date)
        .collect()
}
