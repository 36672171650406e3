use std::io::Write;
use std::path::Path;
use tracing::{info, info_span};

use crate::config::Config;
use crate::error::Result;
use crate::loader::load_records;
use crate::queries::{run_queries, QueryOutcome};
use crate::reader::read_rows;
use crate::sort::sort_records;
use crate::storage::Backend;
use crate::transform::{convert_birthdates, double_salaries, into_records, DateDiagnostic};
use crate::types::Record;

/// Result of the transform half of a run
#[derive(Debug)]
pub struct Prepared {
    pub records: Vec<Record>,
    pub diagnostics: Vec<DateDiagnostic>,
}

/// Result of a complete pipeline run
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub rows_read: usize,
    pub rows_loaded: usize,
    pub diagnostics: Vec<DateDiagnostic>,
    pub queries: Vec<QueryOutcome>,
}

pub struct Pipeline<'a, B: Backend> {
    config: &'a Config,
    backend: &'a B,
}

impl<'a, B: Backend> Pipeline<'a, B> {
    pub fn new(config: &'a Config, backend: &'a B) -> Self {
        Self { config, backend }
    }

    /// Read, transform and sort. Prints each sorted record, and a line for
    /// every birthdate that could not be parsed.
    pub fn prepare(&self, out: &mut dyn Write) -> Result<Prepared> {
        prepare_from(&self.config.source.path, out)
    }

    /// Replace the employees table with `records`
    pub fn load(&self, records: &[Record], out: &mut dyn Write) -> Result<usize> {
        let span = info_span!("stage", name = "load");
        let _enter = span.enter();

        let table = &self.config.database.table;
        let loaded = load_records(
            self.backend,
            table,
            records,
            self.config.load.unparsed_birthdate,
        )?;
        writeln!(out, "Data loaded into {} successfully.", table)?;
        Ok(loaded)
    }

    pub fn query(&self, out: &mut dyn Write) -> Result<Vec<QueryOutcome>> {
        let span = info_span!("stage", name = "query");
        let _enter = span.enter();
        run_queries(self.backend, &self.config.database.table, out)
    }

    /// All five stages in order. The first failure stops the run.
    pub fn run(&self, out: &mut dyn Write) -> Result<PipelineReport> {
        let prepared = self.prepare(out)?;
        let rows_loaded = self.load(&prepared.records, out)?;
        let queries = self.query(out)?;

        let report = PipelineReport {
            rows_read: prepared.records.len(),
            rows_loaded,
            diagnostics: prepared.diagnostics,
            queries,
        };
        info!(
            rows_read = report.rows_read,
            rows_loaded = report.rows_loaded,
            unparsed_birthdates = report.diagnostics.len(),
            "Pipeline finished"
        );
        Ok(report)
    }
}

/// Reader, transformer and sorter; needs no database.
pub fn prepare_from<P: AsRef<Path>>(source: P, out: &mut dyn Write) -> Result<Prepared> {
    let rows = {
        let span = info_span!("stage", name = "read");
        let _enter = span.enter();
        read_rows(source)?
    };

    let (records, diagnostics) = {
        let span = info_span!("stage", name = "transform");
        let _enter = span.enter();
        let mut records = into_records(rows)?;
        double_salaries(&mut records)?;
        let diagnostics = convert_birthdates(&mut records);
        for diagnostic in &diagnostics {
            writeln!(out, "{}", diagnostic.message())?;
        }
        (records, diagnostics)
    };

    let sorted = {
        let span = info_span!("stage", name = "sort");
        let _enter = span.enter();
        sort_records(&records)
    };
    for record in &sorted {
        writeln!(out, "{}", record)?;
    }

    Ok(Prepared {
        records: sorted,
        diagnostics,
    })
}
