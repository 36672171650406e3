use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

use crate::constants::{BIRTHDATE_CUTOFF, HIGH_SALARY_THRESHOLD, OUTPUT_DATE_FORMAT};
use crate::error::{PipelineError, Result};
use crate::queries::AnalyticalQuery;
use crate::storage::traits::{Backend, Session};
use crate::types::{EmployeeRow, QueryRow, StoredBirthdate, Value};

type Tables = HashMap<String, Vec<EmployeeRow>>;

/// In-memory storage implementation for development/testing.
///
/// Clones share the same tables, so a loader session and a later query
/// session see the same data.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed rows of `table`, if it exists
    pub fn rows(&self, table: &str) -> Result<Option<Vec<EmployeeRow>>> {
        Ok(lock(&self.tables)?.get(table).cloned())
    }
}

fn lock(tables: &Mutex<Tables>) -> Result<MutexGuard<'_, Tables>> {
    tables
        .lock()
        .map_err(|_| PipelineError::Storage("in-memory tables lock poisoned".to_string()))
}

impl Backend for InMemoryBackend {
    type Session = InMemorySession;

    fn connect(&self) -> Result<InMemorySession> {
        Ok(InMemorySession {
            shared: Arc::clone(&self.tables),
            pending: None,
        })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Writes go to a private copy of the tables until commit.
pub struct InMemorySession {
    shared: Arc<Mutex<Tables>>,
    pending: Option<Tables>,
}

impl InMemorySession {
    fn pending_mut(&mut self) -> Result<&mut Tables> {
        if self.pending.is_none() {
            let snapshot = lock(&self.shared)?.clone();
            self.pending = Some(snapshot);
        }
        self.pending
            .as_mut()
            .ok_or_else(|| PipelineError::Storage("no pending transaction".to_string()))
    }

    fn visible_rows(&self, table: &str) -> Result<Vec<EmployeeRow>> {
        let rows = match &self.pending {
            Some(pending) => pending.get(table).cloned(),
            None => lock(&self.shared)?.get(table).cloned(),
        };
        rows.ok_or_else(|| PipelineError::Storage(format!("no such table: {}", table)))
    }
}

/// Birthdate as a calendar date, the way the SQLite backend reads it:
/// text counts only when it is exactly a zero-padded YYYY-MM-DD date.
fn stored_date(birthdate: &StoredBirthdate) -> Option<NaiveDate> {
    match birthdate {
        StoredBirthdate::Date(date) => Some(*date),
        StoredBirthdate::Text(text) => NaiveDate::parse_from_str(text, OUTPUT_DATE_FORMAT)
            .ok()
            .filter(|date| date.format(OUTPUT_DATE_FORMAT).to_string() == *text),
        StoredBirthdate::Null => None,
    }
}

fn birthdate_value(birthdate: &StoredBirthdate) -> Value {
    match birthdate {
        StoredBirthdate::Date(date) => Value::Text(date.format(OUTPUT_DATE_FORMAT).to_string()),
        StoredBirthdate::Text(text) => Value::Text(text.clone()),
        StoredBirthdate::Null => Value::Null,
    }
}

fn evaluate(rows: Vec<EmployeeRow>, query: AnalyticalQuery) -> Result<Vec<QueryRow>> {
    let result = match query {
        AnalyticalQuery::HighEarners => {
            let mut matching: Vec<EmployeeRow> = rows
                .into_iter()
                .filter(|r| r.salary > HIGH_SALARY_THRESHOLD)
                .collect();
            matching.sort_by(|a, b| b.salary.total_cmp(&a.salary));
            matching
                .into_iter()
                .map(|r| QueryRow(vec![Value::Text(r.name), Value::Real(r.salary)]))
                .collect()
        }
        AnalyticalQuery::BornAfterCutoff => {
            let cutoff = NaiveDate::parse_from_str(BIRTHDATE_CUTOFF, OUTPUT_DATE_FORMAT)
                .map_err(|e| PipelineError::Storage(format!("bad cutoff date: {}", e)))?;
            rows.into_iter()
                .filter(|r| stored_date(&r.birthdate).is_some_and(|d| d > cutoff))
                .map(|r| {
                    let birthdate = birthdate_value(&r.birthdate);
                    QueryRow(vec![Value::Text(r.name), birthdate])
                })
                .collect()
        }
        AnalyticalQuery::CountByBirthYear => {
            use chrono::Datelike;
            // None orders first, as NULL does in an ascending SQL sort
            let mut counts: BTreeMap<Option<i32>, i64> = BTreeMap::new();
            for row in &rows {
                *counts.entry(stored_date(&row.birthdate).map(|d| d.year())).or_default() += 1;
            }
            counts
                .into_iter()
                .map(|(year, count)| {
                    let year = year.map_or(Value::Null, |y| Value::Integer(i64::from(y)));
                    QueryRow(vec![year, Value::Integer(count)])
                })
                .collect()
        }
    };
    Ok(result)
}

impl Session for InMemorySession {
    fn drop_table_if_exists(&mut self, table: &str) -> Result<()> {
        self.pending_mut()?.remove(table);
        Ok(())
    }

    fn create_table(&mut self, table: &str) -> Result<()> {
        let tables = self.pending_mut()?;
        if tables.contains_key(table) {
            return Err(PipelineError::Storage(format!("table {} already exists", table)));
        }
        tables.insert(table.to_string(), Vec::new());
        Ok(())
    }

    fn insert_rows(&mut self, table: &str, rows: &[EmployeeRow]) -> Result<usize> {
        let target = self
            .pending_mut()?
            .get_mut(table)
            .ok_or_else(|| PipelineError::Storage(format!("no such table: {}", table)))?;
        target.extend_from_slice(rows);
        debug!(table, rows = rows.len(), "Staged rows");
        Ok(rows.len())
    }

    fn run_query(
        &mut self,
        table: &str,
        query: AnalyticalQuery,
        on_row: &mut dyn FnMut(QueryRow) -> Result<()>,
    ) -> Result<usize> {
        let rows = evaluate(self.visible_rows(table)?, query)?;
        let fetched = rows.len();
        for row in rows {
            on_row(row)?;
        }
        Ok(fetched)
    }

    fn commit(mut self) -> Result<()> {
        if let Some(pending) = self.pending.take() {
            *lock(&self.shared)? = pending;
        }
        Ok(())
    }
}
