//! Storage capability interface and its backends
//!
//! The loader and query runner only talk to [`Backend`] and [`Session`];
//! everything dialect-specific lives in the backend modules.

pub mod in_memory;
pub mod sqlite;
pub mod traits;

pub use in_memory::InMemoryBackend;
pub use sqlite::SqliteBackend;
pub use traits::{Backend, Session};
