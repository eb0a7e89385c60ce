//! Sharding conditions: predicate-derived value sets per logical table, as
//! produced by the condition extractor upstream of routing.

use std::fmt;

use shardline_common::Datum;

/// Inclusive range; a missing bound is unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueRange {
    pub lower: Option<Datum>,
    pub upper: Option<Datum>,
}

impl ValueRange {
    pub fn closed(lower: impl Into<Datum>, upper: impl Into<Datum>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: Some(upper.into()),
        }
    }

    pub fn at_least(lower: impl Into<Datum>) -> Self {
        Self {
            lower: Some(lower.into()),
            upper: None,
        }
    }

    pub fn at_most(upper: impl Into<Datum>) -> Self {
        Self {
            lower: None,
            upper: Some(upper.into()),
        }
    }

    /// Both bounds as integers, when present and integral.
    pub fn int_bounds(&self) -> (Option<i64>, Option<i64>) {
        (
            self.lower.as_ref().and_then(Datum::as_i64),
            self.upper.as_ref().and_then(Datum::as_i64),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    Equal,
    Range,
    In,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionValue {
    Equal(Datum),
    In(Vec<Datum>),
    Range(ValueRange),
}

/// One predicate on one sharding column of one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingCondition {
    pub table: String,
    pub column: String,
    pub value: ConditionValue,
}

impl ShardingCondition {
    pub fn equal(table: &str, column: &str, value: impl Into<Datum>) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            value: ConditionValue::Equal(value.into()),
        }
    }

    pub fn in_list<I, V>(table: &str, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Datum>,
    {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            value: ConditionValue::In(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn range(table: &str, column: &str, range: ValueRange) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
            value: ConditionValue::Range(range),
        }
    }

    pub fn operator(&self) -> ConditionOperator {
        match self.value {
            ConditionValue::Equal(_) => ConditionOperator::Equal,
            ConditionValue::In(_) => ConditionOperator::In,
            ConditionValue::Range(_) => ConditionOperator::Range,
        }
    }

    pub fn is_for(&self, table: &str, column: &str) -> bool {
        self.table.eq_ignore_ascii_case(table) && self.column.eq_ignore_ascii_case(column)
    }
}

impl fmt::Display for ShardingCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ", self.table, self.column)?;
        match &self.value {
            ConditionValue::Equal(v) => write!(f, "= {}", v),
            ConditionValue::In(values) => {
                let rendered: Vec<String> = values.iter().map(ToString::to_string).collect();
                write!(f, "IN ({})", rendered.join(", "))
            }
            ConditionValue::Range(range) => match (&range.lower, &range.upper) {
                (Some(lo), Some(hi)) => write!(f, "BETWEEN {} AND {}", lo, hi),
                (Some(lo), None) => write!(f, ">= {}", lo),
                (None, Some(hi)) => write!(f, "<= {}", hi),
                (None, None) => write!(f, "IS ANY"),
            },
        }
    }
}

/// Ordered conditions of one statement (insertion order = predicate order).
/// An empty list routes to every shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingConditions {
    conditions: Vec<ShardingCondition>,
    always_false: bool,
    need_merge: bool,
    same_sharding_condition: bool,
}

impl ShardingConditions {
    pub fn new(conditions: Vec<ShardingCondition>) -> Self {
        Self {
            conditions,
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// The extractor proved the predicate can never match.
    pub fn always_false() -> Self {
        Self {
            always_false: true,
            ..Default::default()
        }
    }

    /// Mark whether conditions of several sub-statements had to be merged and
    /// whether they all resolved to the same sharding values.
    pub fn with_merge(mut self, need_merge: bool, same_sharding_condition: bool) -> Self {
        self.need_merge = need_merge;
        self.same_sharding_condition = same_sharding_condition;
        self
    }

    pub fn push(&mut self, condition: ShardingCondition) {
        self.conditions.push(condition);
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShardingCondition> {
        self.conditions.iter()
    }

    pub fn is_always_false(&self) -> bool {
        self.always_false
    }

    pub fn is_need_merge(&self) -> bool {
        self.need_merge
    }

    pub fn is_same_sharding_condition(&self) -> bool {
        self.same_sharding_condition
    }

    /// Conditions on `table`, in predicate order.
    pub fn for_table(&self, table: &str) -> Vec<&ShardingCondition> {
        self.conditions
            .iter()
            .filter(|c| c.table.eq_ignore_ascii_case(table))
            .collect()
    }

    pub fn render(&self) -> Vec<String> {
        self.conditions.iter().map(ToString::to_string).collect()
    }
}

impl FromIterator<ShardingCondition> for ShardingConditions {
    fn from_iter<I: IntoIterator<Item = ShardingCondition>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
