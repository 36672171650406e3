//! Stage counters for the employee pipeline
//!
//! Counters go through the `metrics` facade. Without an installed recorder
//! they are no-ops, so a plain run pays nothing for them.

macro_rules! stage_metric {
    ($stage:literal, $name:literal) => {
        concat!("employee_pipeline_", $stage, "_", $name, "_total")
    };
}

/// Counter helpers, one per thing a stage can observe
pub struct PipelineMetrics;

impl PipelineMetrics {
    pub fn record_rows_read(count: usize) {
        ::metrics::counter!(stage_metric!("reader", "rows_read")).increment(count as u64);
    }

    pub fn record_salary_normalized() {
        ::metrics::counter!(stage_metric!("transform", "salaries_normalized")).increment(1);
    }

    pub fn record_birthdate_normalized() {
        ::metrics::counter!(stage_metric!("transform", "birthdates_normalized")).increment(1);
    }

    pub fn record_birthdate_unparsed() {
        ::metrics::counter!(stage_metric!("transform", "birthdates_unparsed")).increment(1);
    }

    pub fn record_rows_loaded(count: usize) {
        ::metrics::counter!(stage_metric!("loader", "rows_loaded")).increment(count as u64);
    }

    pub fn record_query_rows(count: usize) {
        ::metrics::counter!(stage_metric!("queries", "rows_fetched")).increment(count as u64);
    }
}
