use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::PipelineMetrics;
use crate::types::RawRow;

/// Read every row of a comma-delimited file, in file order.
///
/// The first line is data, not a header, and rows of any width are passed
/// through untouched. Blank lines are not rows and are skipped; every row
/// keeps the file line it started on, so later errors point at the right place.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<RawRow>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let rows = read_rows_from(file)?;
    info!(path = %path.display(), rows = rows.len(), "Read source file");
    Ok(rows)
}

pub fn read_rows_from<R: Read>(source: R) -> Result<Vec<RawRow>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let line = record
            .position()
            .map_or(index + 1, |position| position.line() as usize);
        let fields: Vec<String> = record.iter().map(str::to_string).collect();
        debug!(line, fields = fields.len(), "Read row");
        rows.push(RawRow { line, fields });
    }
    PipelineMetrics::record_rows_read(rows.len());
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn test_reads_quoted_salaries_without_header() {
        let input = "Bob,555-1234,15/03/1985,\"12,000.00\"\nAnn,555-9876,20/07/1992,\"8,500.50\"\n";
        let rows = read_rows_from(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fields(), ["Bob", "555-1234", "15/03/1985", "12,000.00"]);
        assert_eq!(rows[1].fields()[0], "Ann");
    }

    #[test]
    fn test_rows_of_any_width_pass_through() {
        let input = "a,b\nc,d,e,f,g\n";
        let rows = read_rows_from(input.as_bytes()).unwrap();
        assert_eq!(rows[0].fields().len(), 2);
        assert_eq!(rows[1].fields().len(), 5);
    }

    #[test]
    fn test_blank_lines_are_skipped_but_line_numbers_kept() {
        let input = "Bob,555-1234,15/03/1985,100\n\n\nAnn,555-9876,20/07/1992,200\n";
        let rows = read_rows_from(input.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[1].fields()[0], "Ann");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = read_rows("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
