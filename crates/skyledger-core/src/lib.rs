pub mod analysis;
pub mod classify;
pub mod config;
pub mod consts;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod io;
pub mod night;
pub mod reconcile;
pub mod resolve;
pub mod scan;
pub mod store;
