pub mod config;
pub mod constants;
pub mod error;
pub mod loader;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod queries;
pub mod reader;
pub mod sort;
pub mod storage;
pub mod transform;
pub mod types;
