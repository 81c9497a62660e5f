//! Ordered route table.
//!
//! Routes are evaluated top to bottom and the first structural match wins,
//! so templates that overlap must appear most-specific first. For example
//! `/races/season/{year}` and `/races/{raceId}` precede `/races/{start}/{end}`.
//! [`RouteTable::shadowed`] reports entries that can never match.

use std::fmt;

use axum::http::Method;

use pitlane_lib::{Entity, Query};

use crate::response::Policy;

/// One segment of a path template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Param(&'static str),
}

/// A path template such as `/races/{start}/{end}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: &'static str,
    segments: Vec<Segment>,
}

impl PathTemplate {
    pub fn parse(raw: &'static str) -> Self {
        let segments = raw
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                match segment
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                {
                    Some(name) => Segment::Param(name),
                    None => Segment::Literal(segment),
                }
            })
            .collect();
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &'static str {
        self.raw
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Match decoded path segments, capturing parameters.
    pub fn matches(&self, path: &[String]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }
        let mut params = PathParams::default();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) if *literal == value.as_str() => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => params.values.push((*name, value.clone())),
            }
        }
        Some(params)
    }

    /// True when every path matched by `other` is also matched by `self`.
    pub fn covers(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Param(_), _) => true,
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    (Segment::Literal(_), Segment::Param(_)) => false,
                })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw)
    }
}

/// Parameters captured from a matched path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: Vec<(&'static str, String)>,
}

impl PathParams {
    /// Value of parameter `name`; empty when the template has no such name.
    pub fn get(&self, name: &str) -> &str {
        self.values
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
            .unwrap_or("")
    }

    fn owned(&self, name: &str) -> String {
        self.get(name).to_string()
    }
}

/// One query plus the policy its outcome is normalized with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub query: Query,
    pub policy: Policy,
    /// Message for the 404 outcomes of the policy.
    pub not_found: String,
}

/// What a matched route executes.
pub enum Plan {
    Run(Step),
    /// Resolve a natural-key reference first; the follow-up step is only
    /// built when the reference resolves.
    ResolveThenRun {
        entity: Entity,
        reference: String,
        not_found: &'static str,
        next: Box<dyn FnOnce(i64) -> Step + Send>,
    },
}

impl Plan {
    fn list(query: Query) -> Self {
        Plan::Run(Step {
            query,
            policy: Policy::List,
            not_found: String::new(),
        })
    }

    fn single(query: Query, not_found: &str) -> Self {
        Plan::Run(Step {
            query,
            policy: Policy::Single,
            not_found: not_found.to_string(),
        })
    }

    fn non_empty(query: Query, not_found: String) -> Self {
        Plan::Run(Step {
            query,
            policy: Policy::ListRequireNonEmpty,
            not_found,
        })
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Run(step) => f.debug_tuple("Run").field(step).finish(),
            Plan::ResolveThenRun {
                entity, reference, ..
            } => f
                .debug_struct("ResolveThenRun")
                .field("entity", entity)
                .field("reference", reference)
                .finish_non_exhaustive(),
        }
    }
}

/// Builds the plan for a matched route.
pub type RouteHandler = fn(&PathParams) -> Plan;

/// A `(method, template, handler)` entry.
#[derive(Debug, Clone)]
pub struct Route {
    pub method: Method,
    pub template: PathTemplate,
    pub handler: RouteHandler,
}

impl Route {
    pub fn get(template: &'static str, handler: RouteHandler) -> Self {
        Self {
            method: Method::GET,
            template: PathTemplate::parse(template),
            handler,
        }
    }
}

/// A route that can never match, and the earlier route hiding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shadowed {
    pub route: &'static str,
    pub by: &'static str,
}

impl fmt::Display for Shadowed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} is shadowed by {}", self.route, self.by)
    }
}

/// Ordered list of routes.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// The motorsport API routes, most specific first where they overlap.
    pub fn standard() -> Self {
        Self::new(vec![
            Route::get("/circuits", |_| Plan::list(Query::Circuits)),
            Route::get("/circuits/{ref}", |p| {
                Plan::single(
                    Query::CircuitByRef {
                        reference: p.owned("ref"),
                    },
                    "Circuit not found",
                )
            }),
            Route::get("/constructors", |_| Plan::list(Query::Constructors)),
            Route::get("/constructors/{ref}", |p| {
                Plan::single(
                    Query::ConstructorByRef {
                        reference: p.owned("ref"),
                    },
                    "Constructor not found",
                )
            }),
            Route::get("/races/season/{year}", |p| {
                Plan::list(Query::RacesBySeason {
                    year: p.owned("year"),
                })
            }),
            Route::get("/races/season/{year}/{limit}", |p| {
                Plan::list(Query::RacesBySeasonLimited {
                    year: p.owned("year"),
                    limit: p.owned("limit"),
                })
            }),
            Route::get("/races/circuits/{circuitId}", |p| {
                Plan::list(Query::RacesByCircuit {
                    circuit_id: p.owned("circuitId"),
                })
            }),
            Route::get("/races/circuits/{circuitId}/season/{start}/{end}", |p| {
                Plan::list(Query::RacesByCircuitSeasons {
                    circuit_id: p.owned("circuitId"),
                    start: p.owned("start"),
                    end: p.owned("end"),
                })
            }),
            Route::get("/races/{raceId}", |p| {
                Plan::single(
                    Query::RaceById {
                        race_id: p.owned("raceId"),
                    },
                    "Race not found",
                )
            }),
            Route::get("/races/{start}/{end}", |p| {
                Plan::list(Query::RacesBySeasons {
                    start: p.owned("start"),
                    end: p.owned("end"),
                })
            }),
            Route::get("/drivers", |_| Plan::list(Query::Drivers)),
            Route::get("/drivers/name/{prefix}/limit/{num}", |p| {
                Plan::list(Query::DriversBySurnamePrefix {
                    prefix: p.owned("prefix"),
                    limit: p.owned("num"),
                })
            }),
            Route::get("/drivers/search/{prefix}", |p| {
                Plan::list(Query::DriversBySurnamePrefixCased {
                    prefix: p.owned("prefix"),
                })
            }),
            Route::get("/drivers/race/{raceId}", |p| {
                Plan::list(Query::DriversInRace {
                    race_id: p.owned("raceId"),
                })
            }),
            Route::get("/drivers/{surname}", |p| {
                Plan::single(
                    Query::DriverBySurname {
                        surname: p.owned("surname"),
                    },
                    "Driver not found",
                )
            }),
            Route::get("/results/driver/{driverRef}", |p| Plan::ResolveThenRun {
                entity: Entity::Drivers,
                reference: p.owned("driverRef"),
                not_found: "Driver not found",
                next: Box::new(|driver_id| Step {
                    query: Query::ResultsForDriver { driver_id },
                    policy: Policy::List,
                    not_found: String::new(),
                }),
            }),
            Route::get("/results/drivers/{driverRef}/seasons/{start}/{end}", |p| {
                let start = p.owned("start");
                let end = p.owned("end");
                Plan::ResolveThenRun {
                    entity: Entity::Drivers,
                    reference: p.owned("driverRef"),
                    not_found: "Driver not found",
                    next: Box::new(move |driver_id| Step {
                        query: Query::ResultsForDriverSeasons {
                            driver_id,
                            start,
                            end,
                        },
                        policy: Policy::List,
                        not_found: String::new(),
                    }),
                }
            }),
            Route::get("/results/{raceId}", |p| {
                let race_id = p.owned("raceId");
                let message = format!("No results found for raceId {race_id}");
                Plan::non_empty(Query::ResultsForRace { race_id }, message)
            }),
            Route::get("/qualifying/{raceId}", |p| {
                Plan::list(Query::QualifyingForRace {
                    race_id: p.owned("raceId"),
                })
            }),
            Route::get("/standings/drivers/{raceId}", |p| {
                Plan::list(Query::DriverStandings {
                    race_id: p.owned("raceId"),
                })
            }),
            Route::get("/standings/constructors/{raceId}", |p| {
                Plan::list(Query::ConstructorStandings {
                    race_id: p.owned("raceId"),
                })
            }),
        ])
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// First route matching `method` and the decoded `path` segments.
    pub fn find(&self, method: &Method, path: &[String]) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| route.template.matches(path).map(|params| (route, params)))
    }

    /// Routes hidden by an earlier route with the same method.
    pub fn shadowed(&self) -> Vec<Shadowed> {
        let mut found = Vec::new();
        for (index, route) in self.routes.iter().enumerate() {
            let earlier = self.routes[..index].iter().find(|candidate| {
                candidate.method == route.method && candidate.template.covers(&route.template)
            });
            if let Some(earlier) = earlier {
                found.push(Shadowed {
                    route: route.template.as_str(),
                    by: earlier.template.as_str(),
                });
            }
        }
        found
    }
}
