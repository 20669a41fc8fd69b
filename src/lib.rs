pub mod analyzers;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod infra;
pub mod ingest;
pub mod output;
pub mod reference;
pub mod services;
