//! Pitlane library entry points.
//!
//! This crate turns the fixed set of motorsport access patterns into
//! declarative query descriptors and runs them through a [`DataClient`]:
//! either the PostgREST-backed [`RestClient`] or the in-memory
//! [`MemoryStore`]. HTTP services should only depend on the items exported
//! here instead of building descriptors themselves.

pub mod catalog;
pub mod client;
pub mod descriptor;
pub mod error;
pub mod memory;
pub mod query;
pub mod resolver;
pub mod rest;

pub use catalog::Entity;
pub use client::{execute, DataClient};
pub use descriptor::{ColumnRef, Descriptor, Embed, Filter, FilterOp, OrderKey, Projection};
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use query::{parse_limit, prefix_pattern, Query};
pub use resolver::{lookup_descriptor, resolve_reference};
pub use rest::{encode_query, RestClient, RestClientConfig};
