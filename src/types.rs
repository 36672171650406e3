use chrono::NaiveDate;
use std::fmt;

use crate::constants::{FIELD_COUNT, OUTPUT_DATE_FORMAT};
use crate::error::{PipelineError, Result};

/// One row exactly as the source reader produced it, any number of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based line in the source file where the row starts
    pub line: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn fields(&self) -> &[String] {
        &self.fields
    }
}

/// Salary before and after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum Salary {
    Raw(String),
    Amount(f64),
}

impl Salary {
    pub fn amount(&self) -> Option<f64> {
        match self {
            Salary::Amount(value) => Some(*value),
            Salary::Raw(_) => None,
        }
    }
}

/// Birthdate in the input format, or normalized to a calendar date.
///
/// A value that failed to parse stays `Raw` for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Birthdate {
    Raw(String),
    Iso(NaiveDate),
}

impl Birthdate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Birthdate::Iso(date) => Some(*date),
            Birthdate::Raw(_) => None,
        }
    }
}

impl fmt::Display for Birthdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Birthdate::Raw(text) => f.write_str(text),
            Birthdate::Iso(date) => write!(f, "{}", date.format(OUTPUT_DATE_FORMAT)),
        }
    }
}

/// An employee record flowing through the transform, sort and load stages
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub line: usize,
    pub name: String,
    pub phone: String,
    pub birthdate: Birthdate,
    pub salary: Salary,
}

impl Record {
    /// Build a record from a raw row. Anything but exactly four fields is an error.
    pub fn from_raw(raw: RawRow) -> Result<Self> {
        let RawRow { line, fields } = raw;
        let found = fields.len();
        let [name, phone, birthdate, salary]: [String; FIELD_COUNT] = fields
            .try_into()
            .map_err(|_| PipelineError::FieldCount { line, found })?;
        Ok(Self {
            line,
            name,
            phone,
            birthdate: Birthdate::Raw(birthdate),
            salary: Salary::Raw(salary),
        })
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}, {:?}, {:?}, ",
            self.name,
            self.phone,
            self.birthdate.to_string()
        )?;
        match &self.salary {
            Salary::Amount(value) => write!(f, "{:?}]", value),
            Salary::Raw(text) => write!(f, "{:?}]", text),
        }
    }
}

/// Birthdate as handed to a storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredBirthdate {
    Date(NaiveDate),
    Text(String),
    Null,
}

/// A fully typed row of the `employees` table
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRow {
    pub name: String,
    pub phone: String,
    pub birthdate: StoredBirthdate,
    pub salary: f64,
}

/// A single value fetched by a query
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("None"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Real(x) => write!(f, "{:?}", x),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// One result row, printed tuple style: `("Bob", 31000.0)`
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRow(pub Vec<Value>);

impl fmt::Display for QueryRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", value)?;
        }
        f.write_str(")")
    }
}
