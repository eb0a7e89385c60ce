//! Copy-on-write holder of the current sharding rule.
//!
//! Routing calls `load()` once per statement and keeps the returned
//! `Arc<ShardingRule>` for the whole call; reconfiguration builds a new rule
//! and `replace()`s it. Readers never lock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use shardline_common::{ConfigError, ShardlineConfig};

use crate::rule::ShardingRule;

pub struct RuleRegistry {
    revision: AtomicU64,
    current: ArcSwap<ShardingRule>,
}

impl RuleRegistry {
    pub fn new(rule: ShardingRule) -> Self {
        Self {
            revision: AtomicU64::new(0),
            current: ArcSwap::new(Arc::new(rule)),
        }
    }

    pub fn from_config(config: &ShardlineConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(ShardingRule::from_config(config)?))
    }

    /// Snapshot of the current rule.
    pub fn load(&self) -> Arc<ShardingRule> {
        self.current.load_full()
    }

    /// Number of replacements so far, starting at 0.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Swap in a new rule; returns the new revision.
    pub fn replace(&self, rule: ShardingRule) -> u64 {
        let tables = rule.table_rules().count();
        self.current.store(Arc::new(rule));
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!("sharding rule replaced: revision {}, {} table rules", revision, tables);
        revision
    }

    /// Build a rule from `config` and swap it in. The current rule stays in
    /// place when the build fails.
    pub fn reload(&self, config: &ShardlineConfig) -> Result<u64, ConfigError> {
        let rule = ShardingRule::from_config(config)?;
        Ok(self.replace(rule))
    }
}
