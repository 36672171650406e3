use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::constants::{BIRTHDATE_CUTOFF, HIGH_SALARY_THRESHOLD, OUTPUT_DATE_FORMAT};
use crate::error::Result;
use crate::queries::AnalyticalQuery;
use crate::storage::traits::{Backend, Session};
use crate::types::{EmployeeRow, QueryRow, StoredBirthdate, Value};

/// SQLite database file (or `:memory:`, which lives only as long as one session)
pub struct SqliteBackend {
    path: PathBuf,
}

impl SqliteBackend {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl Backend for SqliteBackend {
    type Session = SqliteSession;

    fn connect(&self) -> Result<SqliteSession> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(&self.path)?;
        debug!(path = %self.path.display(), "Opened SQLite connection");
        Ok(SqliteSession {
            conn,
            in_transaction: false,
        })
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}

pub struct SqliteSession {
    conn: Connection,
    in_transaction: bool,
}

/// True only for a text birthdate that is exactly a valid YYYY-MM-DD date.
///
/// The DATE column has NUMERIC affinity, so unparsed text that looks like a
/// number ("1985") is stored as an INTEGER, and `date()`/`strftime()` would
/// read it as a Julian day. `date()` also accepts one-digit fields and rolls
/// days past month end forward; the round-trip comparison rejects both.
const IS_STORED_DATE: &str = "(typeof(birthdate) = 'text' AND date(birthdate) = birthdate)";

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Integer(n),
        ValueRef::Real(x) => Value::Real(x),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn to_query_row(row: &Row<'_>, columns: usize) -> rusqlite::Result<QueryRow> {
    let mut values = Vec::with_capacity(columns);
    for i in 0..columns {
        values.push(to_value(row.get_ref(i)?));
    }
    Ok(QueryRow(values))
}

impl SqliteSession {
    fn begin(&mut self) -> Result<()> {
        if !self.in_transaction {
            self.conn.execute_batch("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(())
    }

    fn query_sql(table: &str, query: AnalyticalQuery) -> String {
        let table = quote_ident(table);
        match query {
            AnalyticalQuery::HighEarners => format!(
                "SELECT name, salary FROM {} WHERE salary > ?1 ORDER BY salary DESC",
                table
            ),
            AnalyticalQuery::BornAfterCutoff => format!(
                "SELECT name, birthdate FROM {} WHERE {} AND date(birthdate) > date(?1)",
                table, IS_STORED_DATE
            ),
            AnalyticalQuery::CountByBirthYear => format!(
                "SELECT CAST(CASE WHEN {} THEN strftime('%Y', birthdate) END AS INTEGER) AS birth_year,
                        COUNT(*) AS count
                 FROM {}
                 GROUP BY birth_year
                 ORDER BY birth_year",
                IS_STORED_DATE, table
            ),
        }
    }
}

impl Session for SqliteSession {
    fn drop_table_if_exists(&mut self, table: &str) -> Result<()> {
        self.begin()?;
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))?;
        Ok(())
    }

    fn create_table(&mut self, table: &str) -> Result<()> {
        self.begin()?;
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE {} (
                name NVARCHAR(100),
                phone NVARCHAR(20),
                birthdate DATE,
                salary FLOAT
            )
            "#,
            quote_ident(table)
        ))?;
        Ok(())
    }

    fn insert_rows(&mut self, table: &str, rows: &[EmployeeRow]) -> Result<usize> {
        self.begin()?;
        let mut stmt = self.conn.prepare(&format!(
            "INSERT INTO {} (name, phone, birthdate, salary) VALUES (?1, ?2, ?3, ?4)",
            quote_ident(table)
        ))?;
        let mut inserted = 0;
        for row in rows {
            let birthdate = match &row.birthdate {
                StoredBirthdate::Date(date) => Some(date.format(OUTPUT_DATE_FORMAT).to_string()),
                StoredBirthdate::Text(text) => Some(text.clone()),
                StoredBirthdate::Null => None,
            };
            inserted += stmt.execute(params![row.name, row.phone, birthdate, row.salary])?;
        }
        Ok(inserted)
    }

    fn run_query(
        &mut self,
        table: &str,
        query: AnalyticalQuery,
        on_row: &mut dyn FnMut(QueryRow) -> Result<()>,
    ) -> Result<usize> {
        let mut stmt = self.conn.prepare(&Self::query_sql(table, query))?;
        let columns = stmt.column_count();
        let mut rows = match query {
            AnalyticalQuery::HighEarners => stmt.query(params![HIGH_SALARY_THRESHOLD])?,
            AnalyticalQuery::BornAfterCutoff => stmt.query(params![BIRTHDATE_CUTOFF])?,
            AnalyticalQuery::CountByBirthYear => stmt.query([])?,
        };

        let mut fetched = 0;
        while let Some(row) = rows.next()? {
            on_row(to_query_row(row, columns)?)?;
            fetched += 1;
        }
        Ok(fetched)
    }

    fn commit(mut self) -> Result<()> {
        if self.in_transaction {
            self.conn.execute_batch("COMMIT")?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

impl Drop for SqliteSession {
    fn drop(&mut self) {
        if self.in_transaction {
            warn!("Rolling back uncommitted SQLite transaction");
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                warn!("Rollback failed: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn row(name: &str, birthdate: StoredBirthdate, salary: f64) -> EmployeeRow {
        EmployeeRow {
            name: name.to_string(),
            phone: "555".to_string(),
            birthdate,
            salary,
        }
    }

    fn collect(session: &mut SqliteSession, query: AnalyticalQuery) -> Vec<QueryRow> {
        let mut out = Vec::new();
        session
            .run_query("employees", query, &mut |r| {
                out.push(r);
                Ok(())
            })
            .unwrap();
        out
    }

    #[test]
    fn test_uncommitted_writes_roll_back() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("t.db"));
        {
            let mut session = backend.connect().unwrap();
            session.create_table("employees").unwrap();
            session.commit().unwrap();
        }
        {
            let mut session = backend.connect().unwrap();
            session.drop_table_if_exists("employees").unwrap();
            // dropped without commit
        }
        let mut session = backend.connect().unwrap();
        assert!(collect(&mut session, AnalyticalQuery::HighEarners).is_empty());
    }

    #[test]
    fn test_numeric_looking_text_is_not_a_date() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("t.db"));
        let mut session = backend.connect().unwrap();
        session.create_table("employees").unwrap();
        session
            .insert_rows(
                "employees",
                &[
                    row("A", StoredBirthdate::Text("1985".into()), 1.0),
                    row("B", StoredBirthdate::Text("1992-7-20".into()), 1.0),
                    row("C", StoredBirthdate::Text("2020-02-31".into()), 1.0),
                ],
            )
            .unwrap();
        session.commit().unwrap();

        let session = backend.connect().unwrap();
        let stored_type: String = session
            .conn
            .query_row("SELECT typeof(birthdate) FROM employees WHERE name = 'A'", [], |r| r.get(0))
            .unwrap();
        // NUMERIC affinity of the DATE column
        assert_eq!(stored_type, "integer");

        let mut session = session;
        assert!(collect(&mut session, AnalyticalQuery::BornAfterCutoff).is_empty());
        assert_eq!(
            collect(&mut session, AnalyticalQuery::CountByBirthYear),
            vec![QueryRow(vec![Value::Null, Value::Integer(3)])]
        );
    }

    #[test]
    fn test_year_counts_put_unparsed_dates_under_null() {
        let dir = tempdir().unwrap();
        let backend = SqliteBackend::new(dir.path().join("t.db"));
        let mut session = backend.connect().unwrap();
        session.create_table("employees").unwrap();
        let d = |y, m, dd| StoredBirthdate::Date(NaiveDate::from_ymd_opt(y, m, dd).unwrap());
        session
            .insert_rows(
                "employees",
                &[
                    row("A", d(1985, 3, 15), 1.0),
                    row("B", d(1985, 9, 1), 1.0),
                    row("C", StoredBirthdate::Text("31/02/2020".into()), 1.0),
                    row("D", d(1992, 7, 20), 1.0),
                ],
            )
            .unwrap();
        session.commit().unwrap();

        let mut session = backend.connect().unwrap();
        let counts = collect(&mut session, AnalyticalQuery::CountByBirthYear);
        assert_eq!(
            counts,
            vec![
                QueryRow(vec![Value::Null, Value::Integer(1)]),
                QueryRow(vec![Value::Integer(1985), Value::Integer(2)]),
                QueryRow(vec![Value::Integer(1992), Value::Integer(1)]),
            ]
        );

        let born_after = collect(&mut session, AnalyticalQuery::BornAfterCutoff);
        assert_eq!(
            born_after,
            vec![QueryRow(vec![Value::Text("D".into()), Value::Text("1992-07-20".into())])]
        );
    }
}
