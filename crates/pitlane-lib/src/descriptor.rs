//! Declarative query descriptors.
//!
//! A [`Descriptor`] names the base entity, the projection (flat columns plus
//! embedded related entities), the filters, the ordering keys and an optional
//! row limit. Descriptors carry no behavior; data clients interpret them.

use serde_json::Value;

use crate::catalog::Entity;

/// Comparison operators supported by the access patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Equals.
    Eq,
    /// Greater than or equal.
    Gte,
    /// Less than or equal.
    Lte,
    /// Case-sensitive pattern match (`%` and `_` wildcards).
    Like,
    /// Case-insensitive pattern match.
    ILike,
}

impl FilterOp {
    /// Operator name as understood by the data service.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Gte => "gte",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::ILike => "ilike",
        }
    }
}

/// A column, either on the base entity or on an embedded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnRef {
    pub embed: Option<Entity>,
    pub name: &'static str,
}

impl ColumnRef {
    pub fn base(name: &'static str) -> Self {
        Self { embed: None, name }
    }

    pub fn embedded(entity: Entity, name: &'static str) -> Self {
        Self {
            embed: Some(entity),
            name,
        }
    }

    /// Dotted path, e.g. `races.year` for an embedded column.
    pub fn path(&self) -> String {
        match self.embed {
            Some(entity) => format!("{}.{}", entity.table(), self.name),
            None => self.name.to_string(),
        }
    }
}

/// One filter condition. All filters of a descriptor are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: ColumnRef,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(column: ColumnRef, op: FilterOp, value: Value) -> Self {
        Self { column, op, value }
    }

    pub fn eq(column: ColumnRef, value: Value) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }
}

/// Related entity requested alongside the base rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub entity: Entity,
    pub columns: &'static [&'static str],
    /// Drop base rows whose embedded rows are missing or filtered out.
    pub inner: bool,
}

/// Flat columns plus embedded sub-projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub columns: &'static [&'static str],
    pub embeds: Vec<Embed>,
}

/// Ordering key; earlier keys take precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub column: &'static str,
    pub ascending: bool,
}

impl OrderKey {
    pub fn asc(column: &'static str) -> Self {
        Self {
            column,
            ascending: true,
        }
    }
}

/// Fully specified query for one access pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub entity: Entity,
    pub projection: Projection,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderKey>,
    pub limit: Option<u64>,
    unsatisfiable: bool,
}

impl Descriptor {
    /// Start a descriptor selecting `columns` from `entity`.
    pub fn select(entity: Entity, columns: &'static [&'static str]) -> Self {
        Self {
            entity,
            projection: Projection {
                columns,
                embeds: Vec::new(),
            },
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            unsatisfiable: false,
        }
    }

    /// Embed a related entity (left join semantics).
    pub fn embed(mut self, entity: Entity, columns: &'static [&'static str]) -> Self {
        self.projection.embeds.push(Embed {
            entity,
            columns,
            inner: false,
        });
        self
    }

    /// Embed a related entity with inner join semantics.
    pub fn inner_embed(mut self, entity: Entity, columns: &'static [&'static str]) -> Self {
        self.projection.embeds.push(Embed {
            entity,
            columns,
            inner: true,
        });
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Append ascending ordering keys.
    pub fn order_by(mut self, columns: &[&'static str]) -> Self {
        self.order.extend(columns.iter().copied().map(OrderKey::asc));
        self
    }

    pub fn limit(mut self, limit: Option<u64>) -> Self {
        self.limit = limit;
        self
    }

    /// Mark the descriptor as matching no rows at all.
    pub fn matching_nothing(mut self) -> Self {
        self.unsatisfiable = true;
        self
    }

    /// True when a filter value could never match; such a descriptor is
    /// answered with zero rows without reaching the data service.
    pub fn is_unsatisfiable(&self) -> bool {
        self.unsatisfiable
    }

    /// Find the embed for `entity`, if requested.
    pub fn embed_for(&self, entity: Entity) -> Option<&Embed> {
        self.projection.embeds.iter().find(|e| e.entity == entity)
    }
}
