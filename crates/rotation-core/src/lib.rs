// Tabular aggregation and ranking engine for per-game box scores.
//
// `pipeline::run` is the entry point; the other modules are the individual
// stages and can be used on their own.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod filter;
pub mod metrics;
pub mod minutes;
pub mod pipeline;
pub mod rank;
pub mod schema;
pub mod table;

pub use config::RotationConfig;
pub use error::RotationError;
pub use pipeline::{run, run_table, write_report, RotationReport};
pub use table::{Cell, ResultSet, SourceError, Table, TableSink, TableSource};
