use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{Snapshot, Store};

/// Write-behind persistence: mutations push a fresh snapshot onto an
/// unbounded queue and never wait for disk. The writer drains the queue,
/// keeps only the newest snapshot, and writes that one — bursts of activity
/// collapse into a single disk write. Failures are logged and swallowed;
/// in-memory state stays authoritative.
pub fn spawn(store: Store) -> (mpsc::UnboundedSender<Snapshot>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<Snapshot>();

    let handle = tokio::spawn(async move {
        while let Some(mut snapshot) = rx.recv().await {
            // Coalesce everything queued behind it.
            let mut skipped = 0usize;
            while let Ok(newer) = rx.try_recv() {
                snapshot = newer;
                skipped += 1;
            }
            if skipped > 0 {
                debug!("coalesced {} queued snapshots", skipped);
            }

            let store = store.clone();
            let result =
                tokio::task::spawn_blocking(move || store.save(&snapshot)).await;
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("snapshot write failed: {:#}", e),
                Err(e) => warn!("snapshot writer task panicked: {}", e),
            }
        }
        debug!("snapshot writer shutting down");
    });

    (tx, handle)
}
