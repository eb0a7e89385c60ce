//! Rewrite output, as delivered by the SQL rewrite stage.

use indexmap::IndexMap;
use shardline_common::Datum;
use shardline_route::RouteUnit;

/// Rewritten SQL text with its bound parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlRewriteUnit {
    pub sql: String,
    pub parameters: Vec<Datum>,
}

impl SqlRewriteUnit {
    pub fn new(sql: impl Into<String>, parameters: Vec<Datum>) -> Self {
        Self {
            sql: sql.into(),
            parameters,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RewriteResult {
    /// One SQL text for every target.
    Generic(SqlRewriteUnit),
    /// SQL rewritten per route unit, in route order.
    RouteScoped(IndexMap<RouteUnit, SqlRewriteUnit>),
}

impl RewriteResult {
    pub fn generic(sql: impl Into<String>, parameters: Vec<Datum>) -> Self {
        RewriteResult::Generic(SqlRewriteUnit::new(sql, parameters))
    }

    pub fn route_scoped<I>(units: I) -> Self
    where
        I: IntoIterator<Item = (RouteUnit, SqlRewriteUnit)>,
    {
        RewriteResult::RouteScoped(units.into_iter().collect())
    }
}
