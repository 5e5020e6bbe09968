//! Dead peer detection: one background task per established IKE SA
//!
//! After a configurable idle period the task sends an INFORMATIONAL request
//! with an empty encrypted payload and waits for the matching reply under a
//! retransmission timer. The reply handler resets the retry counter; hitting
//! the retry bound tears the SA down as if a Delete(IKE) had been received.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DpdConfig;
use crate::IkeServer;

/// Handle to the liveness task, stored on the IKE SA
pub struct DpdHandle {
    retry: Arc<AtomicU32>,
    reply: Arc<Notify>,
    outstanding: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl DpdHandle {
    /// Record a matching INFORMATIONAL reply: cancel the retransmission
    /// timer and reset the retry counter.
    ///
    /// A no-op unless a probe is actually outstanding, so acknowledgements
    /// of other self-initiated exchanges cannot pre-answer the next probe.
    pub fn record_reply(&self) {
        if !self.outstanding.swap(false, Ordering::SeqCst) {
            return;
        }
        self.retry.store(0, Ordering::SeqCst);
        self.reply.notify_one();
    }

    /// Current retransmission count
    pub fn retry_count(&self) -> u32 {
        self.retry.load(Ordering::SeqCst)
    }

    /// Stop the probe task
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Start the liveness loop for the SA with the given local SPI.
pub(crate) fn spawn(server: Arc<IkeServer>, local_spi: u64, cfg: DpdConfig) -> DpdHandle {
    let retry = Arc::new(AtomicU32::new(0));
    let reply = Arc::new(Notify::new());
    let outstanding = Arc::new(AtomicBool::new(false));

    let task_retry = retry.clone();
    let task_reply = reply.clone();
    let task_outstanding = outstanding.clone();
    let task = tokio::spawn(async move {
        loop {
            sleep(Duration::from_secs(cfg.idle_secs)).await;

            // Raised before the probe leaves so the reply cannot race it
            task_outstanding.store(true, Ordering::SeqCst);
            let probe = match server.send_dpd_probe(local_spi).await {
                Ok(probe) => probe,
                Err(err) => {
                    debug!("Stopping liveness probes for {local_spi:#018x}: {err}");
                    return;
                }
            };

            loop {
                tokio::select! {
                    _ = task_reply.notified() => break,
                    _ = sleep(Duration::from_secs(cfg.retransmit_secs)) => {
                        let retries = task_retry.fetch_add(1, Ordering::SeqCst) + 1;
                        if retries > cfg.max_retries {
                            warn!(
                                "Peer of {local_spi:#018x} is dead after {} unanswered probes",
                                cfg.max_retries
                            );
                            server.teardown_dead_peer(local_spi).await;
                            return;
                        }
                        if server.resend_dpd_probe(local_spi, probe.clone()).await.is_err() {
                            return;
                        }
                    }
                }
            }
        }
    });

    DpdHandle {
        retry,
        reply,
        outstanding,
        task,
    }
}
