//! CLI glue for cloudgraph: argument parsing, store selection and the run summary.
//!
//! All pipeline logic lives in `cloudgraph-core`. This module loads the
//! configuration, builds the graph store, wires Ctrl-C into the run's
//! cancellation token and prints a one-line summary on stdout.
//!
//! For programmatic or integration use, call [`run`] with a constructed [`Cli`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cloudgraph_core::{
    ingest, GraphStore, InMemoryGraphStore, IngestConfig, IngestReport, Neo4jHttpStore,
    SchemaRegistry,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::load_config::load_config;

/// CLI for cloudgraph: load cloud inventory bundles into a property graph.
#[derive(Parser)]
#[clap(
    name = "cloudgraph",
    version,
    about = "Load zip bundles of cloud inventory NDJSON files into a Neo4j property graph"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest a bundle into the configured graph store
    Ingest {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Path to the zip bundle of entity files
        #[clap(long)]
        bundle: PathBuf,
        /// Load into an in-memory graph instead of the configured store
        #[clap(long)]
        dry_run: bool,
    },
    /// Verify that the configured graph store is reachable
    Check {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
    },
}

/// Async CLI entrypoint for main() and integration tests.
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Ingest {
            config,
            bundle,
            dry_run,
        } => {
            let config = load_config(config)?;
            tracing::info!(command = "ingest", bundle = %bundle.display(), dry_run, "Starting ingestion");
            let summary = if dry_run {
                let store = Arc::new(InMemoryGraphStore::new());
                let report = ingest_into(&config.ingest, Arc::clone(&store), &bundle).await?;
                format!(
                    "{} (dry run: {} nodes, {} relationships in memory)",
                    summarise(&report),
                    store.node_count(),
                    store.relationship_count()
                )
            } else {
                let store = Arc::new(Neo4jHttpStore::new(config.require_store()?)?);
                let report = ingest_into(&config.ingest, store, &bundle).await?;
                summarise(&report)
            };
            println!("{summary}");
            Ok(())
        }
        Commands::Check { config } => {
            let config = load_config(config)?;
            let store_config = config.require_store()?;
            let store = Neo4jHttpStore::new(store_config)?;
            store
                .verify_connectivity()
                .await
                .with_context(|| format!("graph store at {} is unreachable", store_config.uri))?;
            tracing::info!(command = "check", uri = %store_config.uri, "Graph store reachable");
            println!("Graph store at {} is reachable", store_config.uri);
            Ok(())
        }
    }
}

async fn ingest_into<S>(config: &IngestConfig, store: Arc<S>, bundle: &Path) -> Result<IngestReport>
where
    S: GraphStore + 'static,
{
    let registry = Arc::new(SchemaRegistry::standard()?);
    let cancel = CancellationToken::new();
    let interrupt = cancel_on_ctrl_c(cancel.clone());
    let result = ingest(config, registry, store, bundle, cancel).await;
    interrupt.abort();

    match result {
        Ok(report) => {
            tracing::info!(command = "ingest", ?report, "Ingestion complete");
            Ok(report)
        }
        Err(e) => {
            tracing::error!(command = "ingest", error = %e, "Ingestion failed");
            Err(e.into())
        }
    }
}

fn cancel_on_ctrl_c(cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling ingestion");
            cancel.cancel();
        }
    })
}

fn summarise(report: &IngestReport) -> String {
    format!(
        "Ingested {} records from {} files: {} nodes and {} relationship rows upserted, \
         {} parse errors, {} derive errors, {} upsert errors, {} failed files, {} ignored files, \
         {} duplicate nodes merged",
        report.records(),
        report.files.len(),
        report.nodes_upserted(),
        report.relationships_upserted(),
        report.parse_errors(),
        report.derive_errors(),
        report.upsert_errors(),
        report.failed_files.len(),
        report.ignored_files.len(),
        report.reconciliation.nodes_removed,
    )
}
