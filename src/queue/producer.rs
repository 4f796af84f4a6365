use std::io;
use std::sync::Arc;

use super::layout::{Message, SIZE_MAX};
use super::Queue;

/// Sending endpoint running the producer side of the gate protocol.
///
/// Per message: take an empty-slot permit (blocking while the buffer
/// is full), enter the mutex, write at head, leave the mutex, post a
/// full-slot permit. A full buffer never drops a message; it makes
/// [`send`](Self::send) wait.
pub struct Producer {
    queue: Arc<Queue>,
}

impl Producer {
    pub(crate) fn new(queue: Arc<Queue>) -> Self {
        Self { queue }
    }

    /// Enqueue a message, blocking while the buffer is full.
    ///
    /// The checksum is stamped over `kind` and `payload` before the
    /// slot is touched. Returns the enqueue sequence number, counting
    /// from 1 across all producers.
    pub fn send(&self, kind: u8, payload: &[u8]) -> io::Result<u64> {
        self.check_payload(payload)?;
        let msg = Message::new(kind, payload);

        let header = self.queue.header();
        header.gate.empty_slots().acquire();
        let seq = {
            let guard = header.gate.lock();
            self.queue.ring().write_at_head(&guard, &msg)
        };
        header.gate.full_slots().release();
        Ok(seq)
    }

    /// Enqueue without blocking.
    ///
    /// Fails with `WouldBlock` when no empty slot is available right
    /// now; the buffer is left untouched.
    pub fn try_send(&self, kind: u8, payload: &[u8]) -> io::Result<u64> {
        self.check_payload(payload)?;
        let msg = Message::new(kind, payload);

        let header = self.queue.header();
        if !header.gate.empty_slots().try_acquire() {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "Queue is full",
            ));
        }
        let seq = {
            let guard = header.gate.lock();
            self.queue.ring().write_at_head(&guard, &msg)
        };
        header.gate.full_slots().release();
        Ok(seq)
    }

    /// The queue this endpoint feeds.
    pub fn queue(&self) -> &Arc<Queue> {
        &self.queue
    }

    fn check_payload(&self, payload: &[u8]) -> io::Result<()> {
        if payload.len() > SIZE_MAX {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Payload too large ({} > {})", payload.len(), SIZE_MAX),
            ));
        }
        Ok(())
    }
}
