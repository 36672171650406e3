use std::io::Write;
use tracing::{info, info_span};

use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::storage::{Backend, Session};

/// The three read-only reports run after every load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticalQuery {
    /// Salary above 30000, highest first
    HighEarners,
    /// Birthdate after 1990-01-01
    BornAfterCutoff,
    /// Head count per birth year, ascending
    CountByBirthYear,
}

impl AnalyticalQuery {
    pub const ALL: [AnalyticalQuery; 3] = [
        AnalyticalQuery::HighEarners,
        AnalyticalQuery::BornAfterCutoff,
        AnalyticalQuery::CountByBirthYear,
    ];

    pub fn banner(&self) -> &'static str {
        match self {
            AnalyticalQuery::HighEarners => "Employees with salary > 30,000:",
            AnalyticalQuery::BornAfterCutoff => "Employees born after 1990:",
            AnalyticalQuery::CountByBirthYear => "Count of employees per birth year:",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AnalyticalQuery::HighEarners => "high_earners",
            AnalyticalQuery::BornAfterCutoff => "born_after_cutoff",
            AnalyticalQuery::CountByBirthYear => "count_by_birth_year",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    pub query: AnalyticalQuery,
    pub rows: usize,
}

/// Run every report against `table`, printing each row as it is fetched.
pub fn run_queries<B: Backend>(
    backend: &B,
    table: &str,
    out: &mut dyn Write,
) -> Result<Vec<QueryOutcome>> {
    let mut session = backend.connect()?;
    let mut outcomes = Vec::with_capacity(AnalyticalQuery::ALL.len());

    for query in AnalyticalQuery::ALL {
        let span = info_span!("query", name = query.name());
        let _enter = span.enter();

        writeln!(out)?;
        writeln!(out, "{}", query.banner())?;
        let rows = session.run_query(table, query, &mut |row| {
            writeln!(out, "{}", row)?;
            Ok(())
        })?;

        info!(rows, "Query finished");
        PipelineMetrics::record_query_rows(rows);
        outcomes.push(QueryOutcome { query, rows });
    }

    // read-only, nothing to commit
    drop(session);
    Ok(outcomes)
}
