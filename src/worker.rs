//! Paced producer and consumer worker routines.
//!
//! Each worker runs one loop against a shared queue: sleep, drive the
//! gate protocol once, report. A cancellation request is observed
//! cooperatively at the top of each cycle, never while the worker is
//! blocked inside an acquire. A worker parked in the gate therefore
//! stays parked until some peer supplies the permit it waits on; only
//! then does it finish the cycle and notice the request.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::queue::{Consumer, Producer, PAYLOAD_MAX, SIZE_MAX};

/// Cooperative stop request shared between an orchestrator and one worker.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

static NEXT_WORKER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identifier for one spawned worker.
///
/// Comparable and hashable, independent of where an orchestrator keeps
/// the worker's handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkerId(u64);

impl WorkerId {
    pub fn next() -> Self {
        Self(NEXT_WORKER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Produce random messages until `token` is cancelled.
///
/// Every cycle generates a message with a pseudo-random type and a
/// declared size drawn from `1..=255`, fills the payload up to that
/// size, and runs the blocking producer protocol. `pace` only spaces
/// the traffic out; correctness never depends on it.
pub fn producer_loop(id: WorkerId, producer: &Producer, token: &CancelToken, pace: Duration) {
    log::info!("producer {id}: started");
    while !token.is_cancelled() {
        thread::sleep(pace);

        let kind = fastrand::u8(..);
        let size = fastrand::usize(1..=SIZE_MAX);
        let mut payload = [0u8; PAYLOAD_MAX];
        for byte in &mut payload[..size] {
            *byte = fastrand::u8(..);
        }

        match producer.send(kind, &payload[..size]) {
            Ok(seq) => log::info!("producer {id}: added message #{seq} (size={size})"),
            Err(e) => {
                log::error!("producer {id}: send failed: {e}");
                break;
            }
        }
    }
    log::info!("producer {id}: stopped");
}

/// Consume messages until `token` is cancelled.
///
/// Reports checksum agreement per message; a mismatch is logged and
/// the message stays consumed, it is neither retried nor requeued.
pub fn consumer_loop(id: WorkerId, consumer: &Consumer, token: &CancelToken, pace: Duration) {
    log::info!("consumer {id}: started");
    while !token.is_cancelled() {
        thread::sleep(pace);

        let delivery = consumer.recv();
        if delivery.checksum_ok {
            log::info!(
                "consumer {id}: consumed message #{} (size={}), checksum OK",
                delivery.seq,
                delivery.message.size
            );
        } else {
            log::warn!(
                "consumer {id}: consumed message #{} (size={}), checksum FAIL",
                delivery.seq,
                delivery.message.size
            );
        }
    }
    log::info!("consumer {id}: stopped");
}
