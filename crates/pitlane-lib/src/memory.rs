//! In-memory data client.
//!
//! [`MemoryStore`] evaluates descriptors against tables held as JSON rows,
//! following the data service's semantics closely enough for tests and for
//! serving a dataset file offline:
//!
//! - an embed whose key column exists on the base row is a to-one join,
//!   otherwise it is a to-many join through the base entity's key column;
//! - filters on embedded columns filter the embedded rows, and only drop the
//!   base row when the embed is an inner join;
//! - ascending order places nulls last.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::catalog::Entity;
use crate::client::DataClient;
use crate::descriptor::{Descriptor, Embed, Filter, FilterOp, OrderKey};
use crate::error::{Error, Result};

type Row = Map<String, Value>;

/// Data client backed by in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: HashMap<Entity, Vec<Row>>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MemoryStore {
    /// Create an empty store with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every call fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Replace the rows of one table. Non-object rows are ignored.
    pub fn with_table(mut self, entity: Entity, rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .filter_map(|row| match row {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        self.tables.insert(entity, rows);
        self
    }

    /// Build a store from a dataset object keyed by table name.
    pub fn from_json(dataset: Value) -> Result<Self> {
        let Value::Object(tables) = dataset else {
            return Err(Error::InvalidDataset {
                message: "expected an object keyed by table name".to_string(),
            });
        };

        let mut store = Self::new();
        for (name, rows) in tables {
            let entity = Entity::from_table(&name).ok_or_else(|| Error::InvalidDataset {
                message: format!("unknown table {name}"),
            })?;
            let Value::Array(rows) = rows else {
                return Err(Error::InvalidDataset {
                    message: format!("table {name} is not an array"),
                });
            };
            let mut parsed = Vec::with_capacity(rows.len());
            for row in rows {
                match row {
                    Value::Object(map) => parsed.push(map),
                    other => {
                        return Err(Error::InvalidDataset {
                            message: format!("table {name} contains a non-object row: {other}"),
                        })
                    }
                }
            }
            store.tables.insert(entity, parsed);
        }
        Ok(store)
    }

    /// Load a dataset file (a JSON object keyed by table name).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::DatasetNotFound {
                path: path.to_path_buf(),
            });
        }

        info!(path = %path.display(), "loading dataset");
        let text = std::fs::read_to_string(path)?;
        let store = Self::from_json(serde_json::from_str(&text)?)?;
        info!(
            tables = store.tables.len(),
            rows = store.row_count(),
            "dataset loaded"
        );
        Ok(store)
    }

    /// Total number of rows across all tables.
    pub fn row_count(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Number of descriptors this store has been asked to fetch.
    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn table(&self, entity: Entity) -> Result<&[Row]> {
        self.tables
            .get(&entity)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                Error::store(format!(
                    "relation \"public.{}\" does not exist",
                    entity.table()
                ))
            })
    }

    fn evaluate(&self, descriptor: &Descriptor) -> Result<Vec<Value>> {
        let mut matched: Vec<(&Row, Row)> = Vec::new();

        'rows: for row in self.table(descriptor.entity)? {
            let keep = descriptor
                .filters
                .iter()
                .filter(|f| f.column.embed.is_none())
                .all(|f| filter_matches(f, row));
            if !keep {
                continue;
            }

            let mut embedded = Row::new();
            for embed in &descriptor.projection.embeds {
                let value = self.embed_value(descriptor, embed, row)?;
                let missing = match &value {
                    Value::Null => true,
                    Value::Array(items) => items.is_empty(),
                    _ => false,
                };
                if embed.inner && missing {
                    continue 'rows;
                }
                embedded.insert(embed.entity.table().to_string(), value);
            }
            matched.push((row, embedded));
        }

        matched.sort_by(|(a, _), (b, _)| compare_rows(a, b, &descriptor.order));

        let limit = descriptor
            .limit
            .map_or(usize::MAX, |limit| usize::try_from(limit).unwrap_or(usize::MAX));

        Ok(matched
            .into_iter()
            .take(limit)
            .map(|(row, embedded)| {
                let mut out = project(row, descriptor.projection.columns);
                out.extend(embedded);
                Value::Object(out)
            })
            .collect())
    }

    fn embed_value(&self, descriptor: &Descriptor, embed: &Embed, row: &Row) -> Result<Value> {
        let related = self.table(embed.entity)?;
        let filters: Vec<&Filter> = descriptor
            .filters
            .iter()
            .filter(|f| f.column.embed == Some(embed.entity))
            .collect();
        let passes = |candidate: &Row| filters.iter().all(|f| filter_matches(f, candidate));

        let related_key = embed.entity.key_column();
        if let Some(foreign_key) = row.get(related_key) {
            let found = related
                .iter()
                .find(|candidate| candidate.get(related_key) == Some(foreign_key))
                .filter(|candidate| passes(candidate));
            return Ok(found.map_or(Value::Null, |candidate| {
                Value::Object(project(candidate, embed.columns))
            }));
        }

        let base_key = descriptor.entity.key_column();
        let Some(id) = row.get(base_key) else {
            return Ok(Value::Array(Vec::new()));
        };
        let items = related
            .iter()
            .filter(|candidate| candidate.get(base_key) == Some(id))
            .filter(|candidate| passes(candidate))
            .map(|candidate| Value::Object(project(candidate, embed.columns)))
            .collect();
        Ok(Value::Array(items))
    }
}

#[async_trait]
impl DataClient for MemoryStore {
    async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(message) = &self.failure {
            return Err(Error::store(message.clone()));
        }
        let rows = self.evaluate(descriptor)?;
        debug!(table = %descriptor.entity, rows = rows.len(), "memory store query");
        Ok(rows)
    }
}

fn project(row: &Row, columns: &[&str]) -> Row {
    columns
        .iter()
        .map(|column| {
            (
                (*column).to_string(),
                row.get(*column).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

fn filter_matches(filter: &Filter, row: &Row) -> bool {
    let Some(value) = row.get(filter.column.name) else {
        return false;
    };
    match filter.op {
        FilterOp::Eq => compare_values(value, &filter.value) == Some(Ordering::Equal),
        FilterOp::Gte => matches!(
            compare_values(value, &filter.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOp::Lte => matches!(
            compare_values(value, &filter.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOp::Like => like_matches(value, &filter.value, false),
        FilterOp::ILike => like_matches(value, &filter.value, true),
    }
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.parse::<f64>().ok()?),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn compare_rows(a: &Row, b: &Row, order: &[OrderKey]) -> Ordering {
    for key in order {
        let ordering = compare_nulls_last(a.get(key.column), b.get(key.column));
        let ordering = if key.ascending {
            ordering
        } else {
            ordering.reverse()
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn compare_nulls_last(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare_values(a, b).unwrap_or(Ordering::Equal),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    AnySequence,
    AnyChar,
    Literal(char),
}

fn like_tokens(pattern: &str) -> Vec<LikeToken> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        let token = match ch {
            '%' => LikeToken::AnySequence,
            '_' => LikeToken::AnyChar,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            other => LikeToken::Literal(other),
        };
        tokens.push(token);
    }
    tokens
}

/// SQL LIKE semantics over the whole value.
fn like_matches(value: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let (Some(value), Some(pattern)) = (value.as_str(), pattern.as_str()) else {
        return false;
    };
    let (value, pattern) = if case_insensitive {
        (value.to_lowercase(), pattern.to_lowercase())
    } else {
        (value.to_string(), pattern.to_string())
    };

    let chars: Vec<char> = value.chars().collect();
    let mut reachable = vec![false; chars.len() + 1];
    reachable[0] = true;

    for token in like_tokens(&pattern) {
        let mut next = vec![false; chars.len() + 1];
        match token {
            LikeToken::AnySequence => {
                let mut seen = false;
                for (i, slot) in next.iter_mut().enumerate() {
                    seen |= reachable[i];
                    *slot = seen;
                }
            }
            LikeToken::AnyChar => {
                for i in 0..chars.len() {
                    if reachable[i] {
                        next[i + 1] = true;
                    }
                }
            }
            LikeToken::Literal(expected) => {
                for i in 0..chars.len() {
                    if reachable[i] && chars[i] == expected {
                        next[i + 1] = true;
                    }
                }
            }
        }
        reachable = next;
    }

    reachable[chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ColumnRef;
    use serde_json::json;

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with_table(
                Entity::Circuits,
                vec![
                    json!({"circuitId": 1, "name": "Albert Park", "location": "Melbourne", "country": "Australia"}),
                    json!({"circuitId": 2, "name": "Sepang", "location": "Kuala Lumpur", "country": "Malaysia"}),
                ],
            )
            .with_table(
                Entity::Races,
                vec![
                    json!({"raceId": 10, "year": 2009, "round": 2, "circuitId": 2, "name": "Malaysian Grand Prix"}),
                    json!({"raceId": 9, "year": 2009, "round": 1, "circuitId": 1, "name": "Australian Grand Prix"}),
                    json!({"raceId": 20, "year": 2010, "round": 1, "circuitId": 3, "name": "Bahrain Grand Prix"}),
                ],
            )
    }

    fn like(value: &str, pattern: &str, ci: bool) -> bool {
        like_matches(&json!(value), &json!(pattern), ci)
    }

    #[test]
    fn like_patterns() {
        assert!(like("Schumacher", "Sch%", false));
        assert!(!like("Schumacher", "sch%", false));
        assert!(like("Schumacher", "sch%", true));
        assert!(like("Räikkönen", "Rä_kk%", false));
        assert!(like("a_b", "a\\_b", false));
        assert!(!like("axb", "a\\_b", false));
        assert!(like("50%", "50\\%%", false));
        assert!(like("", "%", false));
        assert!(!like("abc", "ab", false));
    }

    #[tokio::test]
    async fn to_one_embed_is_projected() {
        let store = store();
        let descriptor = Descriptor::select(Entity::Races, &["raceId", "year"])
            .embed(Entity::Circuits, &["name", "country"])
            .order_by(&["year", "round"]);

        let rows = store.fetch(&descriptor).await.unwrap();
        assert_eq!(
            rows[0],
            json!({"raceId": 9, "year": 2009, "circuits": {"name": "Albert Park", "country": "Australia"}})
        );
        assert_eq!(rows[1]["raceId"], 10);
        // circuit 3 is absent from the table
        assert_eq!(rows[2]["circuits"], Value::Null);
    }

    #[tokio::test]
    async fn inner_embed_drops_unmatched_rows() {
        let store = store();
        let descriptor = Descriptor::select(Entity::Races, &["raceId"])
            .inner_embed(Entity::Circuits, &["name"])
            .filter(Filter::eq(
                ColumnRef::embedded(Entity::Circuits, "country"),
                json!("Malaysia"),
            ));

        let rows = store.fetch(&descriptor).await.unwrap();
        assert_eq!(rows, vec![json!({"raceId": 10, "circuits": {"name": "Sepang"}})]);
    }

    #[tokio::test]
    async fn left_embed_filter_nulls_the_embed_only() {
        let store = store();
        let descriptor = Descriptor::select(Entity::Races, &["raceId"])
            .embed(Entity::Circuits, &["name"])
            .filter(Filter::eq(
                ColumnRef::embedded(Entity::Circuits, "country"),
                json!("Malaysia"),
            ))
            .order_by(&["raceId"]);

        let rows = store.fetch(&descriptor).await.unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["circuits"], Value::Null);
        assert_eq!(rows[1]["circuits"]["name"], "Sepang");
    }

    #[tokio::test]
    async fn to_many_embed_goes_through_base_key() {
        let store = MemoryStore::new()
            .with_table(
                Entity::Drivers,
                vec![json!({"driverId": 1, "surname": "Hamilton"}), json!({"driverId": 2, "surname": "Kovalainen"})],
            )
            .with_table(
                Entity::Results,
                vec![
                    json!({"resultId": 1, "raceId": 18, "driverId": 1}),
                    json!({"resultId": 2, "raceId": 19, "driverId": 2}),
                ],
            );
        let descriptor = Descriptor::select(Entity::Drivers, &["driverId"])
            .inner_embed(Entity::Results, &["raceId"])
            .filter(Filter::eq(ColumnRef::embedded(Entity::Results, "raceId"), json!(18)));

        let rows = store.fetch(&descriptor).await.unwrap();
        assert_eq!(rows, vec![json!({"driverId": 1, "results": [{"raceId": 18}]})]);
    }

    #[tokio::test]
    async fn limit_and_nulls_last() {
        let store = MemoryStore::new().with_table(
            Entity::Qualifying,
            vec![
                json!({"qualifyId": 3, "position": null}),
                json!({"qualifyId": 2, "position": 2}),
                json!({"qualifyId": 1, "position": 1}),
            ],
        );
        let descriptor = Descriptor::select(Entity::Qualifying, &["qualifyId"]).order_by(&["position"]);
        let rows = store.fetch(&descriptor).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["qualifyId"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let rows = store.fetch(&descriptor.limit(Some(2))).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[tokio::test]
    async fn missing_table_is_a_store_error() {
        let store = MemoryStore::new();
        let err = store
            .fetch(&Descriptor::select(Entity::Races, &["raceId"]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
        assert!(err.to_string().contains("races"));
    }

    #[tokio::test]
    async fn failing_store_counts_calls() {
        let store = MemoryStore::failing("boom");
        let descriptor = Descriptor::select(Entity::Races, &["raceId"]);
        assert!(store.fetch(&descriptor).await.is_err());
        assert!(store.fetch(&descriptor).await.is_err());
        assert_eq!(store.calls(), 2);
    }

    #[test]
    fn dataset_shape_is_validated() {
        assert!(MemoryStore::from_json(json!([])).is_err());
        assert!(MemoryStore::from_json(json!({"pit_stops": []})).is_err());
        assert!(MemoryStore::from_json(json!({"races": {}})).is_err());
        assert!(MemoryStore::from_json(json!({"races": [1]})).is_err());

        let store = MemoryStore::from_json(json!({"races": [{"raceId": 1}], "drivers": []})).unwrap();
        assert_eq!(store.row_count(), 1);
    }

    #[test]
    fn loading_missing_file_reports_path() {
        let err = MemoryStore::load("/nonexistent/dataset.json").unwrap_err();
        assert!(matches!(err, Error::DatasetNotFound { .. }));
    }
}
