#![doc = "cloudgraph-core: core logic library for cloudgraph."]

//! This crate loads a cloud inventory bundle (a zip of per-label NDJSON files)
//! into a property graph. It holds the data model, the schema registry, the
//! streaming and upsert pipeline, and the graph store backends.
//!
//! # Usage
//! Build a [`SchemaRegistry`], pick a [`GraphStore`] and hand both to
//! [`ingest::ingest`] together with an [`IngestConfig`].

pub mod archive;
pub mod config;
pub mod contract;
pub mod error;
pub mod ingest;
pub mod memory;
pub mod model;
pub mod neo4j;
pub mod reconcile;
pub mod registry;
pub mod stream;
pub mod upsert;

pub use config::{IngestConfig, StoreConfig};
pub use contract::{GraphStore, ReconcileSummary};
pub use error::IngestError;
pub use ingest::{ingest, IngestReport};
pub use memory::InMemoryGraphStore;
pub use neo4j::Neo4jHttpStore;
pub use registry::SchemaRegistry;
