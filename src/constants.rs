/// Fixed values shared by the transform, load and query stages.

/// Table every run drops and recreates
pub const EMPLOYEES_TABLE: &str = "employees";

/// Every input row carries name, phone, birthdate, salary
pub const FIELD_COUNT: usize = 4;
pub const BIRTHDATE_FIELD: usize = 2;

/// Salaries are doubled after the thousands separators are removed
pub const SALARY_FACTOR: f64 = 2.0;
pub const THOUSANDS_SEPARATOR: char = ',';

// Birthdates arrive as DD/MM/YYYY and are stored as YYYY-MM-DD
pub const INPUT_DATE_FORMAT: &str = "%d/%m/%Y";
pub const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Query thresholds
pub const HIGH_SALARY_THRESHOLD: f64 = 30000.0;
pub const BIRTHDATE_CUTOFF: &str = "1990-01-01";

// Defaults used when neither the config file nor the environment says otherwise
pub const DEFAULT_SOURCE_PATH: &str = "employees_data.csv";
pub const DEFAULT_DATABASE_PATH: &str = "employees.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
