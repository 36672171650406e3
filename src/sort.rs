use std::cmp::Ordering;

use crate::types::Record;

/// Order two records by salary, then by name.
///
/// Records whose salary was never normalized come first.
pub fn compare_records(a: &Record, b: &Record) -> Ordering {
    let by_salary = match (a.salary.amount(), b.salary.amount()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_salary.then_with(|| a.name.cmp(&b.name))
}

/// Return a sorted copy; the input is left as it was.
pub fn sort_records(records: &[Record]) -> Vec<Record> {
    let mut sorted = records.to_vec();
    sorted.sort_by(compare_records);
    sorted
}
