use tracing::{info, warn};

use crate::config::UnparsedBirthdatePolicy;
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::storage::{Backend, Session};
use crate::types::{Birthdate, EmployeeRow, Record, Salary, StoredBirthdate};

/// Map a transformed record onto a row of the employees table.
pub fn to_employee_row(record: &Record, policy: UnparsedBirthdatePolicy) -> Result<EmployeeRow> {
    let salary = match &record.salary {
        Salary::Amount(value) => *value,
        Salary::Raw(_) => {
            return Err(PipelineError::UntransformedSalary {
                name: record.name.clone(),
            })
        }
    };
    let birthdate = match (&record.birthdate, policy) {
        (Birthdate::Iso(date), _) => StoredBirthdate::Date(*date),
        (Birthdate::Raw(text), UnparsedBirthdatePolicy::Keep) => StoredBirthdate::Text(text.clone()),
        (Birthdate::Raw(_), UnparsedBirthdatePolicy::Null) => StoredBirthdate::Null,
        (Birthdate::Raw(text), UnparsedBirthdatePolicy::Reject) => {
            return Err(PipelineError::UnparsedBirthdate {
                name: record.name.clone(),
                value: text.clone(),
            })
        }
    };
    Ok(EmployeeRow {
        name: record.name.clone(),
        phone: record.phone.clone(),
        birthdate,
        salary,
    })
}

/// Replace `table` with exactly `records`, in order, in one transaction.
///
/// Any failure leaves the previous table untouched: the session is dropped
/// uncommitted and its writes are discarded.
pub fn load_records<B: Backend>(
    backend: &B,
    table: &str,
    records: &[Record],
    policy: UnparsedBirthdatePolicy,
) -> Result<usize> {
    let mut session = backend.connect()?;
    info!(target_db = %backend.describe(), table, "Replacing table");

    session.drop_table_if_exists(table)?;
    session.create_table(table)?;

    let rows = records
        .iter()
        .map(|record| to_employee_row(record, policy))
        .collect::<Result<Vec<_>>>()?;
    let unparsed = rows
        .iter()
        .filter(|row| matches!(row.birthdate, StoredBirthdate::Text(_)))
        .count();
    if unparsed > 0 {
        warn!(unparsed, "Storing unparsed birthdates as text in a DATE column");
    }

    let inserted = session.insert_rows(table, &rows)?;
    session.commit()?;

    PipelineMetrics::record_rows_loaded(inserted);
    info!(inserted, table, "Load committed");
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(birthdate: Birthdate, salary: Salary) -> Record {
        Record {
            line: 1,
            name: "Bob".to_string(),
            phone: "555-1234".to_string(),
            birthdate,
            salary,
        }
    }

    #[test]
    fn test_parsed_birthdate_is_a_date_under_every_policy() {
        let date = NaiveDate::from_ymd_opt(1985, 3, 15).unwrap();
        for policy in [
            UnparsedBirthdatePolicy::Keep,
            UnparsedBirthdatePolicy::Null,
            UnparsedBirthdatePolicy::Reject,
        ] {
            let row = to_employee_row(&record(Birthdate::Iso(date), Salary::Amount(24000.0)), policy).unwrap();
            assert_eq!(row.birthdate, StoredBirthdate::Date(date));
            assert_eq!(row.salary, 24000.0);
        }
    }

    #[test]
    fn test_unparsed_birthdate_policies() {
        let rec = record(Birthdate::Raw("31/02/2020".into()), Salary::Amount(1.0));
        assert_eq!(
            to_employee_row(&rec, UnparsedBirthdatePolicy::Keep).unwrap().birthdate,
            StoredBirthdate::Text("31/02/2020".into())
        );
        assert_eq!(
            to_employee_row(&rec, UnparsedBirthdatePolicy::Null).unwrap().birthdate,
            StoredBirthdate::Null
        );
        assert!(matches!(
            to_employee_row(&rec, UnparsedBirthdatePolicy::Reject),
            Err(PipelineError::UnparsedBirthdate { .. })
        ));
    }

    #[test]
    fn test_raw_salary_cannot_be_loaded() {
        let rec = record(Birthdate::Raw("x".into()), Salary::Raw("12,000.00".into()));
        assert!(matches!(
            to_employee_row(&rec, UnparsedBirthdatePolicy::Keep),
            Err(PipelineError::UntransformedSalary { .. })
        ));
    }
}
