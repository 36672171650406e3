use crate::error::Result;
use crate::queries::AnalyticalQuery;
use crate::types::{EmployeeRow, QueryRow};

/// Something that can hand out database sessions
pub trait Backend {
    type Session: Session;

    /// Acquire a session. It is released when dropped, on every exit path.
    fn connect(&self) -> Result<Self::Session>;

    /// Human readable target, used in logs
    fn describe(&self) -> String;
}

/// One scoped connection to a backend.
///
/// Writes are transactional: nothing is visible to other sessions until
/// [`Session::commit`], and a session dropped without committing discards
/// its writes.
pub trait Session {
    fn drop_table_if_exists(&mut self, table: &str) -> Result<()>;

    /// Create the fixed four-column employees schema under `table`
    fn create_table(&mut self, table: &str) -> Result<()>;

    /// Insert every row with bound parameters, returning the count inserted
    fn insert_rows(&mut self, table: &str, rows: &[EmployeeRow]) -> Result<usize>;

    /// Run a fixed query, handing each row to `on_row` as it is fetched.
    /// Returns the number of rows produced.
    fn run_query(
        &mut self,
        table: &str,
        query: AnalyticalQuery,
        on_row: &mut dyn FnMut(QueryRow) -> Result<()>,
    ) -> Result<usize>;

    fn commit(self) -> Result<()>;
}
