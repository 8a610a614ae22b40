//! Ingestion pipeline and persistence for the quarterly financial dataset.
//!
//! Upload bytes become a [`upload::RawTable`], which the [`validator`] checks
//! against the [`schema`], the [`normalize`] step turns into typed records,
//! the [`merge`] step combines with the current dataset, and the
//! [`store::DatasetStore`] persists behind a backup.

pub mod error;
pub mod merge;
pub mod normalize;
pub mod schema;
pub mod store;
pub mod upload;
pub mod validator;
