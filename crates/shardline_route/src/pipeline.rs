//! One routing call: select → route → validate.

use shardline_common::{RouteError, RouteProps};

use crate::condition::ShardingConditions;
use crate::metadata::StorageMetadata;
use crate::rule::ShardingRule;
use crate::selector::RouteEngineSelector;
use crate::statement::StatementContext;
use crate::validator::{RouteValidator, ValidatedRoute};

/// Stateless routing pipeline over borrowed, read-only inputs. Safe to run
/// concurrently for any number of statements against the same rule.
pub struct RoutingPipeline<'a> {
    rule: &'a ShardingRule,
    metadata: &'a dyn StorageMetadata,
    props: &'a RouteProps,
}

impl<'a> RoutingPipeline<'a> {
    pub fn new(rule: &'a ShardingRule, metadata: &'a dyn StorageMetadata, props: &'a RouteProps) -> Self {
        Self { rule, metadata, props }
    }

    pub fn route(
        &self,
        statement: &StatementContext,
        conditions: &ShardingConditions,
    ) -> Result<ValidatedRoute, RouteError> {
        let strategy = RouteEngineSelector::select(statement, self.rule, conditions, self.props);
        let route_context = strategy.route(self.rule, self.metadata, conditions)?;
        RouteValidator::new(self.rule, self.metadata, self.props).validate(route_context, statement, conditions)
    }
}
