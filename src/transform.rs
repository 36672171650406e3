use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::constants::{INPUT_DATE_FORMAT, SALARY_FACTOR, THOUSANDS_SEPARATOR};
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::types::{Birthdate, RawRow, Record, Salary};

/// A birthdate that could not be parsed and was left as-is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateDiagnostic {
    pub name: String,
    pub value: String,
}

impl DateDiagnostic {
    /// Console line for the operator
    pub fn message(&self) -> String {
        format!("Could not parse date: {}", self.value)
    }
}

/// Turn raw rows into records. Rows without exactly four fields are fatal.
pub fn into_records(rows: Vec<RawRow>) -> Result<Vec<Record>> {
    rows.into_iter().map(Record::from_raw).collect()
}

/// Strip thousands separators and parse what is left.
pub fn parse_salary(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != THOUSANDS_SEPARATOR).collect();
    cleaned.trim().parse::<f64>().ok()
}

/// Replace every raw salary with its doubled numeric value.
///
/// The first salary that does not parse halts the whole pass.
pub fn double_salaries(records: &mut [Record]) -> Result<()> {
    for record in records.iter_mut() {
        if let Salary::Raw(text) = &record.salary {
            let amount = parse_salary(text).ok_or_else(|| PipelineError::SalaryParse {
                line: record.line,
                value: text.clone(),
            })?;
            record.salary = Salary::Amount(amount * SALARY_FACTOR);
            PipelineMetrics::record_salary_normalized();
        }
    }
    Ok(())
}

pub fn parse_birthdate(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, INPUT_DATE_FORMAT).ok()
}

/// Rewrite DD/MM/YYYY birthdates as calendar dates.
///
/// Unparsable values stay unchanged and are reported back, never fatal.
pub fn convert_birthdates(records: &mut [Record]) -> Vec<DateDiagnostic> {
    let mut diagnostics = Vec::new();
    for record in records.iter_mut() {
        let Birthdate::Raw(text) = &record.birthdate else {
            continue;
        };
        match parse_birthdate(text) {
            Some(date) => {
                debug!(name = %record.name, %date, "Normalized birthdate");
                record.birthdate = Birthdate::Iso(date);
                PipelineMetrics::record_birthdate_normalized();
            }
            None => {
                warn!(name = %record.name, value = %text, "Could not parse birthdate");
                PipelineMetrics::record_birthdate_unparsed();
                diagnostics.push(DateDiagnostic {
                    name: record.name.clone(),
                    value: text.clone(),
                });
            }
        }
    }
    diagnostics
}
