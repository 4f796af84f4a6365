use std::sync::Arc;

use super::layout::Message;
use super::Queue;

/// One dequeued message together with its integrity verdict.
#[derive(Debug, Clone, Copy)]
pub struct Delivery {
    pub message: Message,

    /// Dequeue sequence number, counting from 1 across all consumers.
    pub seq: u64,

    /// Whether the recomputed checksum matched the stored one. A
    /// mismatch does not undo the dequeue; the message is consumed
    /// either way and the verdict is the caller's to report.
    pub checksum_ok: bool,
}

/// Receiving endpoint running the consumer side of the gate protocol.
///
/// Per message: take a full-slot permit (blocking while the buffer is
/// empty), enter the mutex, read at tail, leave the mutex, post an
/// empty-slot permit, then verify the checksum on the copied-out
/// message.
pub struct Consumer {
    queue: Arc<Queue>,
}

impl Consumer {
    pub(crate) fn new(queue: Arc<Queue>) -> Self {
        Self { queue }
    }

    /// Dequeue the oldest message, blocking while the buffer is empty.
    pub fn recv(&self) -> Delivery {
        let header = self.queue.header();
        header.gate.full_slots().acquire();
        let (message, seq) = {
            let guard = header.gate.lock();
            self.queue.ring().read_at_tail(&guard)
        };
        header.gate.empty_slots().release();

        Delivery {
            checksum_ok: message.verify(),
            message,
            seq,
        }
    }

    /// Dequeue without blocking. Returns `None` when the buffer holds
    /// no message right now.
    pub fn try_recv(&self) -> Option<Delivery> {
        let header = self.queue.header();
        if !header.gate.full_slots().try_acquire() {
            return None;
        }
        let (message, seq) = {
            let guard = header.gate.lock();
            self.queue.ring().read_at_tail(&guard)
        };
        header.gate.empty_slots().release();

        Some(Delivery {
            checksum_ok: message.verify(),
            message,
            seq,
        })
    }

    /// The queue this endpoint drains.
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }
}
