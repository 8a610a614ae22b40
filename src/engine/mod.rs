//! Read-side projections over a loaded dataset: filtering, headline figures,
//! per-company time series and year-over-year growth.

pub mod filters;
pub mod growth;
pub mod summary;
pub mod types;
