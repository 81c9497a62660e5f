//! Query builder: one [`Query`] variant per access pattern.
//!
//! Variants carry the raw path parameters exactly as they arrived. Turning
//! them into a [`Descriptor`] never fails: malformed identifiers produce a
//! descriptor that matches nothing, malformed limits are dropped.

use serde_json::Value;

use crate::catalog::{self, Entity};
use crate::descriptor::{ColumnRef, Descriptor, Filter, FilterOp};

/// Rows fetched by the connectivity probe.
pub const PROBE_LIMIT: u64 = 3;

/// Named access patterns exposed by the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Circuits,
    CircuitByRef { reference: String },
    Constructors,
    ConstructorByRef { reference: String },
    RacesBySeason { year: String },
    RacesBySeasonLimited { year: String, limit: String },
    RacesByCircuit { circuit_id: String },
    RacesByCircuitSeasons {
        circuit_id: String,
        start: String,
        end: String,
    },
    RaceById { race_id: String },
    RacesBySeasons { start: String, end: String },
    Drivers,
    /// Case-insensitive surname prefix with an optional limit.
    DriversBySurnamePrefix { prefix: String, limit: String },
    /// Case-sensitive surname prefix.
    DriversBySurnamePrefixCased { prefix: String },
    DriversInRace { race_id: String },
    DriverBySurname { surname: String },
    ResultsForRace { race_id: String },
    /// Results of an already resolved driver.
    ResultsForDriver { driver_id: i64 },
    ResultsForDriverSeasons {
        driver_id: i64,
        start: String,
        end: String,
    },
    QualifyingForRace { race_id: String },
    DriverStandings { race_id: String },
    ConstructorStandings { race_id: String },
    /// A cheap bounded read used to check that the data service answers.
    ConnectivityProbe,
}

impl Query {
    /// Stable pattern name used in logs and metric labels.
    pub fn name(&self) -> &'static str {
        match self {
            Query::Circuits => "circuits",
            Query::CircuitByRef { .. } => "circuit_by_ref",
            Query::Constructors => "constructors",
            Query::ConstructorByRef { .. } => "constructor_by_ref",
            Query::RacesBySeason { .. } => "races_by_season",
            Query::RacesBySeasonLimited { .. } => "races_by_season_limited",
            Query::RacesByCircuit { .. } => "races_by_circuit",
            Query::RacesByCircuitSeasons { .. } => "races_by_circuit_seasons",
            Query::RaceById { .. } => "race_by_id",
            Query::RacesBySeasons { .. } => "races_by_seasons",
            Query::Drivers => "drivers",
            Query::DriversBySurnamePrefix { .. } => "drivers_by_surname_prefix",
            Query::DriversBySurnamePrefixCased { .. } => "drivers_by_surname_prefix_cased",
            Query::DriversInRace { .. } => "drivers_in_race",
            Query::DriverBySurname { .. } => "driver_by_surname",
            Query::ResultsForRace { .. } => "results_for_race",
            Query::ResultsForDriver { .. } => "results_for_driver",
            Query::ResultsForDriverSeasons { .. } => "results_for_driver_seasons",
            Query::QualifyingForRace { .. } => "qualifying_for_race",
            Query::DriverStandings { .. } => "driver_standings",
            Query::ConstructorStandings { .. } => "constructor_standings",
            Query::ConnectivityProbe => "connectivity_probe",
        }
    }

    /// Build the descriptor for this access pattern.
    pub fn descriptor(&self) -> Descriptor {
        match self {
            Query::Circuits => {
                Descriptor::select(Entity::Circuits, catalog::CIRCUIT_COLUMNS).order_by(&["circuitId"])
            }
            Query::CircuitByRef { reference } => {
                Descriptor::select(Entity::Circuits, catalog::CIRCUIT_COLUMNS)
                    .filter(text_eq("circuitRef", reference))
            }
            Query::Constructors => Descriptor::select(Entity::Constructors, catalog::CONSTRUCTOR_COLUMNS)
                .order_by(&["name", "constructorId"]),
            Query::ConstructorByRef { reference } => {
                Descriptor::select(Entity::Constructors, catalog::CONSTRUCTOR_COLUMNS)
                    .filter(text_eq("constructorRef", reference))
            }
            Query::RacesBySeason { year } => {
                id_eq(races(), ColumnRef::base("year"), year).order_by(&["round", "raceId"])
            }
            Query::RacesBySeasonLimited { year, limit } => id_eq(races(), ColumnRef::base("year"), year)
                .order_by(&["round", "raceId"])
                .limit(parse_limit(limit)),
            Query::RacesByCircuit { circuit_id } => {
                id_eq(races(), ColumnRef::base("circuitId"), circuit_id)
                    .order_by(&["year", "round", "raceId"])
            }
            Query::RacesByCircuitSeasons {
                circuit_id,
                start,
                end,
            } => {
                let descriptor = id_eq(races(), ColumnRef::base("circuitId"), circuit_id);
                season_range(descriptor, ColumnRef::base("year"), start, end)
                    .order_by(&["year", "round", "raceId"])
            }
            Query::RaceById { race_id } => id_eq(races(), ColumnRef::base("raceId"), race_id),
            Query::RacesBySeasons { start, end } => {
                season_range(races(), ColumnRef::base("year"), start, end)
                    .order_by(&["year", "round", "raceId"])
            }
            Query::Drivers => drivers().order_by(&["surname", "forename", "driverId"]),
            Query::DriversBySurnamePrefix { prefix, limit } => drivers()
                .filter(Filter::new(
                    ColumnRef::base("surname"),
                    FilterOp::ILike,
                    Value::String(prefix_pattern(prefix)),
                ))
                .order_by(&["surname", "driverId"])
                .limit(parse_limit(limit)),
            Query::DriversBySurnamePrefixCased { prefix } => drivers()
                .filter(Filter::new(
                    ColumnRef::base("surname"),
                    FilterOp::Like,
                    Value::String(prefix_pattern(prefix)),
                ))
                .order_by(&["surname", "driverId"]),
            Query::DriversInRace { race_id } => {
                let descriptor =
                    drivers().inner_embed(Entity::Results, catalog::RACE_ENTRY_COLUMNS);
                id_eq(
                    descriptor,
                    ColumnRef::embedded(Entity::Results, "raceId"),
                    race_id,
                )
                .order_by(&["surname", "forename", "driverId"])
            }
            Query::DriverBySurname { surname } => drivers()
                .filter(text_eq("surname", surname))
                .order_by(&["driverId"]),
            Query::ResultsForRace { race_id } => {
                id_eq(results(), ColumnRef::base("raceId"), race_id)
                    .order_by(&["positionOrder", "resultId"])
            }
            Query::ResultsForDriver { driver_id } => results()
                .filter(Filter::eq(ColumnRef::base("driverId"), Value::from(*driver_id)))
                .order_by(&["positionOrder", "raceId", "resultId"]),
            Query::ResultsForDriverSeasons {
                driver_id,
                start,
                end,
            } => {
                let descriptor = Descriptor::select(Entity::Results, catalog::RESULT_COLUMNS)
                    .inner_embed(Entity::Races, catalog::RESULT_RACE_COLUMNS)
                    .embed(Entity::Drivers, catalog::PARTICIPANT_DRIVER_COLUMNS)
                    .embed(Entity::Constructors, catalog::PARTICIPANT_CONSTRUCTOR_COLUMNS)
                    .filter(Filter::eq(ColumnRef::base("driverId"), Value::from(*driver_id)));
                season_range(
                    descriptor,
                    ColumnRef::embedded(Entity::Races, "year"),
                    start,
                    end,
                )
                .order_by(&["positionOrder", "raceId", "resultId"])
            }
            Query::QualifyingForRace { race_id } => {
                let descriptor = Descriptor::select(Entity::Qualifying, catalog::QUALIFYING_COLUMNS)
                    .embed(Entity::Races, catalog::QUALIFYING_RACE_COLUMNS)
                    .embed(Entity::Drivers, catalog::PARTICIPANT_DRIVER_COLUMNS)
                    .embed(Entity::Constructors, catalog::PARTICIPANT_CONSTRUCTOR_COLUMNS);
                id_eq(descriptor, ColumnRef::base("raceId"), race_id)
                    .order_by(&["position", "qualifyId"])
            }
            Query::DriverStandings { race_id } => {
                let descriptor =
                    Descriptor::select(Entity::DriverStandings, catalog::DRIVER_STANDING_COLUMNS)
                        .embed(Entity::Drivers, catalog::STANDING_DRIVER_COLUMNS);
                id_eq(descriptor, ColumnRef::base("raceId"), race_id)
                    .order_by(&["position", "driverStandingsId"])
            }
            Query::ConstructorStandings { race_id } => {
                let descriptor = Descriptor::select(
                    Entity::ConstructorStandings,
                    catalog::CONSTRUCTOR_STANDING_COLUMNS,
                )
                .embed(Entity::Constructors, catalog::STANDING_CONSTRUCTOR_COLUMNS);
                id_eq(descriptor, ColumnRef::base("raceId"), race_id)
                    .order_by(&["position", "constructorStandingsId"])
            }
            Query::ConnectivityProbe => Descriptor::select(Entity::Races, &["raceId", "name"])
                .order_by(&["raceId"])
                .limit(Some(PROBE_LIMIT)),
        }
    }
}

fn races() -> Descriptor {
    Descriptor::select(Entity::Races, catalog::RACE_COLUMNS)
        .embed(Entity::Circuits, catalog::RACE_CIRCUIT_COLUMNS)
}

fn drivers() -> Descriptor {
    Descriptor::select(Entity::Drivers, catalog::DRIVER_COLUMNS)
}

fn results() -> Descriptor {
    Descriptor::select(Entity::Results, catalog::RESULT_COLUMNS)
        .embed(Entity::Races, catalog::RESULT_RACE_COLUMNS)
        .embed(Entity::Drivers, catalog::PARTICIPANT_DRIVER_COLUMNS)
        .embed(Entity::Constructors, catalog::PARTICIPANT_CONSTRUCTOR_COLUMNS)
}

fn text_eq(column: &'static str, raw: &str) -> Filter {
    Filter::eq(ColumnRef::base(column), Value::String(raw.to_string()))
}

fn integer(raw: &str) -> Option<Value> {
    raw.parse::<i64>().ok().map(Value::from)
}

/// Equality on a numeric column. A non-integer value matches nothing.
fn id_eq(descriptor: Descriptor, column: ColumnRef, raw: &str) -> Descriptor {
    match integer(raw) {
        Some(value) => descriptor.filter(Filter::eq(column, value)),
        None => descriptor.matching_nothing(),
    }
}

/// Inclusive `[start, end]` range on a numeric column. Reversed bounds are
/// kept as-is and simply match nothing.
fn season_range(descriptor: Descriptor, column: ColumnRef, start: &str, end: &str) -> Descriptor {
    match (integer(start), integer(end)) {
        (Some(start), Some(end)) => descriptor
            .filter(Filter::new(column, FilterOp::Gte, start))
            .filter(Filter::new(column, FilterOp::Lte, end)),
        _ => descriptor.matching_nothing(),
    }
}

/// Build a `starts-with` LIKE pattern, escaping wildcards in the input.
pub fn prefix_pattern(raw: &str) -> String {
    let mut pattern = String::with_capacity(raw.len() + 1);
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Parse a limit the way `parseInt` does: optional sign, then the leading
/// decimal digits. Anything unparsable or not positive means "no limit".
pub fn parse_limit(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..digits_end];
    if digits.is_empty() || negative {
        return None;
    }
    digits.parse::<u64>().ok().filter(|limit| *limit > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn limit_parsing_degrades_to_unbounded() {
        assert_eq!(parse_limit("12"), Some(12));
        assert_eq!(parse_limit("12abc"), Some(12));
        assert_eq!(parse_limit(" 7"), Some(7));
        assert_eq!(parse_limit("+3"), Some(3));
        assert_eq!(parse_limit("0"), None);
        assert_eq!(parse_limit("-5"), None);
        assert_eq!(parse_limit("abc"), None);
        assert_eq!(parse_limit(""), None);
        assert_eq!(parse_limit("99999999999999999999999"), None);
    }

    #[test]
    fn prefix_pattern_escapes_wildcards() {
        assert_eq!(prefix_pattern("sch"), "sch%");
        assert_eq!(prefix_pattern("a_b"), "a\\_b%");
        assert_eq!(prefix_pattern("50%"), "50\\%%");
        assert_eq!(prefix_pattern(""), "%");
    }

    #[test]
    fn race_range_is_inclusive_and_ordered() {
        let descriptor = Query::RacesBySeasons {
            start: "2005".into(),
            end: "2007".into(),
        }
        .descriptor();

        assert_eq!(descriptor.entity, Entity::Races);
        assert_eq!(descriptor.filters.len(), 2);
        assert_eq!(descriptor.filters[0].op, FilterOp::Gte);
        assert_eq!(descriptor.filters[0].value, json!(2005));
        assert_eq!(descriptor.filters[1].op, FilterOp::Lte);
        assert_eq!(descriptor.filters[1].value, json!(2007));
        let order: Vec<_> = descriptor.order.iter().map(|k| k.column).collect();
        assert_eq!(order, vec!["year", "round", "raceId"]);
        assert_eq!(descriptor.projection.embeds[0].entity, Entity::Circuits);
        assert_eq!(
            descriptor.projection.embeds[0].columns,
            catalog::RACE_CIRCUIT_COLUMNS
        );
    }

    #[test]
    fn reversed_range_is_not_rejected() {
        let descriptor = Query::RacesBySeasons {
            start: "2010".into(),
            end: "2000".into(),
        }
        .descriptor();
        assert!(!descriptor.is_unsatisfiable());
        assert_eq!(descriptor.filters.len(), 2);
    }

    #[test]
    fn malformed_identifier_matches_nothing() {
        let descriptor = Query::RaceById {
            race_id: "abc".into(),
        }
        .descriptor();
        assert!(descriptor.is_unsatisfiable());

        let descriptor = Query::RacesBySeasons {
            start: "x".into(),
            end: "2000".into(),
        }
        .descriptor();
        assert!(descriptor.is_unsatisfiable());
    }

    #[test]
    fn limited_patterns_drop_bad_limits() {
        for raw in ["0", "-5", "abc"] {
            let descriptor = Query::DriversBySurnamePrefix {
                prefix: "sch".into(),
                limit: raw.into(),
            }
            .descriptor();
            assert_eq!(descriptor.limit, None, "limit {raw:?} should be dropped");
        }

        let descriptor = Query::RacesBySeasonLimited {
            year: "2009".into(),
            limit: "4".into(),
        }
        .descriptor();
        assert_eq!(descriptor.limit, Some(4));
    }

    #[test]
    fn prefix_patterns_differ_only_in_case_sensitivity() {
        let insensitive = Query::DriversBySurnamePrefix {
            prefix: "Ham".into(),
            limit: "".into(),
        }
        .descriptor();
        let sensitive = Query::DriversBySurnamePrefixCased {
            prefix: "Ham".into(),
        }
        .descriptor();

        assert_eq!(insensitive.filters[0].op, FilterOp::ILike);
        assert_eq!(sensitive.filters[0].op, FilterOp::Like);
        assert_eq!(insensitive.filters[0].value, sensitive.filters[0].value);
        assert_eq!(insensitive.order, sensitive.order);
    }

    #[test]
    fn driver_results_in_seasons_filter_the_joined_race() {
        let descriptor = Query::ResultsForDriverSeasons {
            driver_id: 1,
            start: "2008".into(),
            end: "2009".into(),
        }
        .descriptor();

        let races = descriptor.embed_for(Entity::Races).expect("races embedded");
        assert!(races.inner);
        let range: Vec<_> = descriptor
            .filters
            .iter()
            .filter(|f| f.column.embed == Some(Entity::Races))
            .map(|f| (f.column.path(), f.op))
            .collect();
        assert_eq!(
            range,
            vec![
                ("races.year".to_string(), FilterOp::Gte),
                ("races.year".to_string(), FilterOp::Lte)
            ]
        );
    }

    #[test]
    fn drivers_in_race_joins_results() {
        let descriptor = Query::DriversInRace {
            race_id: "18".into(),
        }
        .descriptor();
        let embed = descriptor.embed_for(Entity::Results).expect("results embedded");
        assert!(embed.inner);
        assert_eq!(descriptor.filters[0].column.path(), "results.raceId");
        assert_eq!(descriptor.filters[0].value, json!(18));
    }

    #[test]
    fn every_list_pattern_has_a_total_order() {
        let id = || "1".to_string();
        let lists: Vec<(Query, Vec<&str>)> = vec![
            (Query::Circuits, vec!["circuitId"]),
            (Query::Constructors, vec!["name", "constructorId"]),
            (Query::RacesBySeason { year: id() }, vec!["round", "raceId"]),
            (
                Query::RacesBySeasonLimited {
                    year: id(),
                    limit: "3".into(),
                },
                vec!["round", "raceId"],
            ),
            (
                Query::RacesByCircuit { circuit_id: id() },
                vec!["year", "round", "raceId"],
            ),
            (
                Query::RacesByCircuitSeasons {
                    circuit_id: id(),
                    start: "2005".into(),
                    end: "2007".into(),
                },
                vec!["year", "round", "raceId"],
            ),
            (
                Query::RacesBySeasons {
                    start: "2005".into(),
                    end: "2007".into(),
                },
                vec!["year", "round", "raceId"],
            ),
            (Query::Drivers, vec!["surname", "forename", "driverId"]),
            (
                Query::DriversBySurnamePrefix {
                    prefix: "s".into(),
                    limit: "5".into(),
                },
                vec!["surname", "driverId"],
            ),
            (
                Query::DriversBySurnamePrefixCased { prefix: "S".into() },
                vec!["surname", "driverId"],
            ),
            (
                Query::DriversInRace { race_id: id() },
                vec!["surname", "forename", "driverId"],
            ),
            (Query::DriverBySurname { surname: "Schumacher".into() }, vec!["driverId"]),
            (
                Query::ResultsForRace { race_id: id() },
                vec!["positionOrder", "resultId"],
            ),
            (
                Query::ResultsForDriver { driver_id: 1 },
                vec!["positionOrder", "raceId", "resultId"],
            ),
            (
                Query::ResultsForDriverSeasons {
                    driver_id: 1,
                    start: "2005".into(),
                    end: "2007".into(),
                },
                vec!["positionOrder", "raceId", "resultId"],
            ),
            (
                Query::QualifyingForRace { race_id: id() },
                vec!["position", "qualifyId"],
            ),
            (
                Query::DriverStandings { race_id: id() },
                vec!["position", "driverStandingsId"],
            ),
            (
                Query::ConstructorStandings { race_id: id() },
                vec!["position", "constructorStandingsId"],
            ),
            (Query::ConnectivityProbe, vec!["raceId"]),
        ];

        for (query, expected) in lists {
            let descriptor = query.descriptor();
            let order: Vec<_> = descriptor.order.iter().map(|k| k.column).collect();
            assert_eq!(order, expected, "{}", query.name());
            assert!(descriptor.order.iter().all(|k| k.ascending));

            // Orders ending in anything but the entity key could tie.
            assert_eq!(
                order.last().copied(),
                Some(descriptor.entity.key_column()),
                "{} is not tie-broken by its key",
                query.name()
            );
        }
    }

    #[test]
    fn results_are_ordered_by_finishing_position_first() {
        let descriptor = Query::ResultsForDriver { driver_id: 4 }.descriptor();
        assert_eq!(descriptor.order[0].column, "positionOrder");
        let descriptor = Query::ResultsForRace {
            race_id: "4".into(),
        }
        .descriptor();
        assert_eq!(descriptor.order[0].column, "positionOrder");
    }
}
