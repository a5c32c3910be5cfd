//! Post-import reconciler.
//!
//! Relationship merges create stub endpoints keyed on whichever label the
//! referencing record assumed, so one identity can end up as several nodes
//! (a `User` stub and a `Group` node for the same member id, say). Once every
//! file is in, nodes sharing an identity are folded into one: labels are
//! unioned, properties already on the survivor win, and edges are re-pointed.

use std::time::Instant;

use tracing::{error, info};

use crate::contract::{GraphStore, ReconcileSummary};
use crate::error::StoreError;

/// Run one reconciliation pass. Safe to repeat: a converged graph reports zero merges.
pub async fn reconcile<S>(store: &S) -> Result<ReconcileSummary, StoreError>
where
    S: GraphStore + ?Sized,
{
    info!("[RECONCILE] Merging nodes that share an identity");
    let started = Instant::now();
    match store.reconcile_duplicate_identities().await {
        Ok(summary) => {
            info!(
                groups_merged = summary.groups_merged,
                nodes_removed = summary.nodes_removed,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "[RECONCILE] Reconciliation complete"
            );
            Ok(summary)
        }
        Err(e) => {
            error!(error = %e, "[RECONCILE][ERROR] Reconciliation failed");
            Err(e)
        }
    }
}
