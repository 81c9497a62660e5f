//! Entity catalog for the motorsport dataset.
//!
//! Table names, key columns, natural-key columns and the documented column
//! subsets every access pattern projects. Keeping the projections here means
//! a payload shape only changes when this file changes.

use std::fmt;

/// Tables exposed by the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Circuits,
    Races,
    Drivers,
    Constructors,
    Results,
    Qualifying,
    DriverStandings,
    ConstructorStandings,
}

impl Entity {
    /// Every entity, in table-name order of the dataset dump.
    pub const ALL: [Entity; 8] = [
        Entity::Circuits,
        Entity::Races,
        Entity::Drivers,
        Entity::Constructors,
        Entity::Results,
        Entity::Qualifying,
        Entity::DriverStandings,
        Entity::ConstructorStandings,
    ];

    /// Table name in the data service. Embedded rows are keyed by this name.
    pub fn table(self) -> &'static str {
        match self {
            Entity::Circuits => "circuits",
            Entity::Races => "races",
            Entity::Drivers => "drivers",
            Entity::Constructors => "constructors",
            Entity::Results => "results",
            Entity::Qualifying => "qualifying",
            Entity::DriverStandings => "driver_standings",
            Entity::ConstructorStandings => "constructor_standings",
        }
    }

    /// Internal numeric identifier column.
    pub fn key_column(self) -> &'static str {
        match self {
            Entity::Circuits => "circuitId",
            Entity::Races => "raceId",
            Entity::Drivers => "driverId",
            Entity::Constructors => "constructorId",
            Entity::Results => "resultId",
            Entity::Qualifying => "qualifyId",
            Entity::DriverStandings => "driverStandingsId",
            Entity::ConstructorStandings => "constructorStandingsId",
        }
    }

    /// Projection containing only the key column.
    pub fn key_projection(self) -> &'static [&'static str] {
        match self {
            Entity::Circuits => &["circuitId"],
            Entity::Races => &["raceId"],
            Entity::Drivers => &["driverId"],
            Entity::Constructors => &["constructorId"],
            Entity::Results => &["resultId"],
            Entity::Qualifying => &["qualifyId"],
            Entity::DriverStandings => &["driverStandingsId"],
            Entity::ConstructorStandings => &["constructorStandingsId"],
        }
    }

    /// Natural-key reference column, for the entities that have one.
    pub fn reference_column(self) -> Option<&'static str> {
        match self {
            Entity::Circuits => Some("circuitRef"),
            Entity::Drivers => Some("driverRef"),
            Entity::Constructors => Some("constructorRef"),
            _ => None,
        }
    }

    /// Look up an entity by its table name.
    pub fn from_table(name: &str) -> Option<Self> {
        Entity::ALL.into_iter().find(|entity| entity.table() == name)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

pub const CIRCUIT_COLUMNS: &[&str] = &["circuitId", "circuitRef", "name", "location", "country"];

pub const CONSTRUCTOR_COLUMNS: &[&str] = &["constructorId", "constructorRef", "name"];

pub const DRIVER_COLUMNS: &[&str] = &["driverId", "driverRef", "code", "forename", "surname"];

pub const RACE_COLUMNS: &[&str] = &["raceId", "year", "round", "name"];

/// Circuit columns embedded in a race.
pub const RACE_CIRCUIT_COLUMNS: &[&str] = &["name", "location", "country"];

pub const RESULT_COLUMNS: &[&str] = &[
    "resultId",
    "raceId",
    "driverId",
    "constructorId",
    "positionOrder",
    "points",
    "grid",
    "laps",
    "statusId",
];

/// Race columns embedded in a result.
pub const RESULT_RACE_COLUMNS: &[&str] = &["year", "round", "name"];

pub const QUALIFYING_COLUMNS: &[&str] = &["qualifyId", "raceId", "position", "q1", "q2", "q3"];

/// Race columns embedded in a qualifying entry.
pub const QUALIFYING_RACE_COLUMNS: &[&str] = &["name", "year"];

/// Driver columns embedded in results and qualifying entries.
pub const PARTICIPANT_DRIVER_COLUMNS: &[&str] = &["forename", "surname"];

/// Constructor columns embedded in results and qualifying entries.
pub const PARTICIPANT_CONSTRUCTOR_COLUMNS: &[&str] = &["name"];

pub const DRIVER_STANDING_COLUMNS: &[&str] = &[
    "driverStandingsId",
    "raceId",
    "driverId",
    "position",
    "points",
    "wins",
];

pub const STANDING_DRIVER_COLUMNS: &[&str] = &["driverRef", "forename", "surname"];

pub const CONSTRUCTOR_STANDING_COLUMNS: &[&str] = &[
    "constructorStandingsId",
    "raceId",
    "constructorId",
    "position",
    "points",
    "wins",
];

pub const STANDING_CONSTRUCTOR_COLUMNS: &[&str] = &["constructorRef", "name"];

/// Result columns joined when listing the drivers of one race.
pub const RACE_ENTRY_COLUMNS: &[&str] = &["raceId"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_round_trip() {
        for entity in Entity::ALL {
            assert_eq!(Entity::from_table(entity.table()), Some(entity));
        }
        assert_eq!(Entity::from_table("lap_times"), None);
    }

    #[test]
    fn key_projection_matches_key_column() {
        for entity in Entity::ALL {
            assert_eq!(entity.key_projection(), &[entity.key_column()]);
        }
    }

    #[test]
    fn only_named_entities_have_references() {
        let with_refs: Vec<_> = Entity::ALL
            .into_iter()
            .filter(|e| e.reference_column().is_some())
            .collect();
        assert_eq!(
            with_refs,
            vec![Entity::Circuits, Entity::Drivers, Entity::Constructors]
        );
    }

    #[test]
    fn flat_projections_lead_with_key_column() {
        assert_eq!(CIRCUIT_COLUMNS[0], Entity::Circuits.key_column());
        assert_eq!(DRIVER_COLUMNS[0], Entity::Drivers.key_column());
        assert_eq!(RACE_COLUMNS[0], Entity::Races.key_column());
        assert_eq!(RESULT_COLUMNS[0], Entity::Results.key_column());
        assert_eq!(QUALIFYING_COLUMNS[0], Entity::Qualifying.key_column());
    }
}
