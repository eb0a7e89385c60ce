//! Execution context building.
//!
//! Takes a [`ValidatedRoute`](shardline_route::ValidatedRoute) plus the SQL
//! rewrite produced for it and emits the execution units handed to the
//! statement executor. Only validated routes are accepted.

pub mod builder;
pub mod rewrite;
pub mod unit;

pub use builder::ExecutionContextBuilder;
pub use rewrite::{RewriteResult, SqlRewriteUnit};
pub use unit::{ExecutionUnit, ExecutionUnits, SqlUnit};
