//! Query modules for the dashboard SDK.
//!
//! Each module provides a query struct that borrows from the SDK's
//! [`Connection`](crate::connection::Connection) and/or its
//! [`ObjectStore`](crate::store::ObjectStore) and exposes methods returning
//! `Result<T>` with typed payloads.

pub mod plots;
pub mod results;

pub use plots::PlotQuery;
pub use results::{date_from_key, default_export_file_name, export_file_name, ResultQuery};
