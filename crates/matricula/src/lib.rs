pub mod config;
pub mod directory;
pub mod documents;
pub mod enrollment;
pub mod error;
pub mod observations;
pub mod school_years;
pub mod store;
pub mod telemetry;
pub mod validate;
