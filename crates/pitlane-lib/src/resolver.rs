//! Natural-key reference resolution.

use serde_json::Value;
use tracing::debug;

use crate::catalog::Entity;
use crate::client::{execute, DataClient};
use crate::descriptor::{ColumnRef, Descriptor, Filter};
use crate::error::{Error, Result};

/// Descriptor looking up the key column of `entity` by its reference column.
///
/// No ordering is imposed: the data service's first row wins.
pub fn lookup_descriptor(entity: Entity, reference: &str) -> Result<Descriptor> {
    let column = entity
        .reference_column()
        .ok_or(Error::UnsupportedReference {
            table: entity.table(),
        })?;
    Ok(Descriptor::select(entity, entity.key_projection()).filter(Filter::eq(
        ColumnRef::base(column),
        Value::String(reference.to_string()),
    )))
}

/// Resolve `reference` to the internal identifier of `entity`.
///
/// Returns `Ok(None)` when no row matches or the first row has no usable
/// key; store failures are returned as errors.
pub async fn resolve_reference(
    client: &dyn DataClient,
    entity: Entity,
    reference: &str,
) -> Result<Option<i64>> {
    let descriptor = lookup_descriptor(entity, reference)?;
    let rows = execute(client, &descriptor).await?;
    let id = rows
        .first()
        .and_then(|row| row.get(entity.key_column()))
        .and_then(Value::as_i64);

    debug!(table = %entity, reference, matches = rows.len(), resolved = ?id, "reference lookup");
    Ok(id)
}
