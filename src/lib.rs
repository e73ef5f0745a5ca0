// Per-Diem Dashboard - Core Library
// Exposes the pipeline for the CLI, the web server, and tests

pub mod config;
pub mod error;
pub mod loader;  // Loader/Normalizer - canonical table
pub mod locale;  // pt-BR amount and date codec
pub mod query;   // Query Engine - dashboard views
pub mod report;

// Re-export commonly used types
pub use error::{FieldCoercionError, LoadError, QueryError};
pub use loader::{
    load, load_or_empty, LoadStats, Record, Table, UNSPECIFIED_ENTITY, UNSPECIFIED_ROLE,
};
pub use locale::{format_amount, format_currency, format_date, parse_amount, parse_issue_date};
pub use query::{
    query, DashboardView, DetailRow, EntityFilter, GroupTotal, MonthRange, Summary,
    ALL_ENTITIES,
};
