use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Line {line} has {found} fields, expected 4 (name, phone, birthdate, salary)")]
    FieldCount { line: usize, found: usize },

    #[error("Line {line}: could not convert salary '{value}' to a number")]
    SalaryParse { line: usize, value: String },

    #[error("Salary for '{name}' was never normalized")]
    UntransformedSalary { name: String },

    #[error("Birthdate '{value}' for '{name}' is not a valid date")]
    UnparsedBirthdate { name: String, value: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
