//! Command implementations for the sitesearch CLI

mod build;
mod query;
mod serve;

pub use build::execute as build;
pub use query::execute as query;
pub use serve::execute as serve;
