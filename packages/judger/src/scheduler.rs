use std::sync::Arc;

use common::mq::ResultSink;
use common::task::JudgerTask;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{JudgerError, Result};
use crate::executor::Execute;
use crate::sandbox::Sandbox;

/// The pool of sandbox slot ids, the only shared mutable state in this
/// process. Acquire and release are atomic with respect to each other, so two
/// deliveries can never hold the same slot.
pub struct SlotPool {
    capacity: usize,
    available: Mutex<Vec<u32>>,
}

impl SlotPool {
    pub fn new(slots: Vec<u32>) -> Self {
        Self {
            capacity: slots.len(),
            available: Mutex::new(slots),
        }
    }

    /// Number of slots the pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take one slot out of the pool, or None if all are in flight.
    pub async fn acquire(&self) -> Option<u32> {
        self.available.lock().await.pop()
    }

    pub async fn release(&self, slot: u32) {
        let mut available = self.available.lock().await;
        debug_assert!(!available.contains(&slot), "slot {slot} released twice");
        available.push(slot);
    }

    pub async fn available(&self) -> usize {
        self.available.lock().await.len()
    }
}

/// What to do with the broker message after a delivery was handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Result published; acknowledge the message.
    Completed,
    /// Not processed at all; reject and requeue for another delivery.
    Requeue,
    /// Processing failed; reject without requeue so a poison message cannot
    /// loop forever.
    Drop,
}

/// Consumes judger tasks under the slot-pool bound and turns them into
/// published results.
///
/// The broker's prefetch is set to the pool size, which is the sole
/// concurrency throttle; the no-slot requeue path below is defensive only.
pub struct Scheduler {
    pool: Arc<SlotPool>,
    sandbox: Arc<dyn Sandbox>,
    executor: Arc<dyn Execute>,
    results: Arc<dyn ResultSink>,
}

impl Scheduler {
    pub fn new(
        pool: Arc<SlotPool>,
        sandbox: Arc<dyn Sandbox>,
        executor: Arc<dyn Execute>,
        results: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            pool,
            sandbox,
            executor,
            results,
        }
    }

    pub fn pool(&self) -> &SlotPool {
        &self.pool
    }

    /// Destroy every slot's sandbox once and mark it available. Run before
    /// consuming, so a crashed predecessor leaves no residue.
    pub async fn reset_slots(sandbox: &Arc<dyn Sandbox>, slots: &[u32]) {
        for &slot in slots {
            if let Err(e) = sandbox.destroy(slot).await {
                // Destroying a box that was never initialized fails; that is
                // the normal first-boot case.
                debug!(slot, error = %e, "startup sandbox cleanup");
            }
        }
    }

    /// Handle one raw delivery from the task queue.
    pub async fn handle_delivery(&self, payload: serde_json::Value) -> Disposition {
        let Some(slot) = self.pool.acquire().await else {
            info!("Received a task when no slot is available");
            return Disposition::Requeue;
        };

        let outcome = self.process_on_slot(slot, payload).await;

        // Success or failure, the slot's sandbox is destroyed and the slot
        // returned before the next message is taken.
        if let Err(e) = self.sandbox.destroy(slot).await {
            warn!(slot, error = %e, "failed to destroy sandbox");
        }
        self.pool.release(slot).await;

        match outcome {
            Ok(()) => Disposition::Completed,
            Err(e) => {
                error!(slot, error = %e, "task processing failed, dropping message");
                Disposition::Drop
            }
        }
    }

    async fn process_on_slot(&self, slot: u32, payload: serde_json::Value) -> Result<()> {
        self.sandbox.init(slot).await?;

        // An unrecognized task tag fails here and takes the drop path; it is
        // never retried.
        let task: JudgerTask = serde_json::from_value(payload)?;
        info!(
            slot,
            submission_id = %task.submission_id(),
            "Processing a new task"
        );

        let result = self.executor.execute(task, slot).await?;
        self.results
            .publish_result(result)
            .await
            .map_err(JudgerError::from)?;
        Ok(())
    }
}
