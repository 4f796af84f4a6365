use std::mem::size_of;
use std::ptr;
use std::sync::atomic::Ordering::Relaxed;

use super::layout::{Message, QueueHeader};
use super::ring::RingBuffer;
use crate::sys::sema::GateGuard;

impl RingBuffer {
    /// Create a ring buffer view over an initialized region.
    ///
    /// # Safety
    /// `base` must point to a region of at least
    /// `region_size((*base).capacity)` bytes holding a written
    /// [`QueueHeader`], and must stay valid for the life of the view.
    pub unsafe fn new(base: *mut u8) -> Self {
        let header = base as *const QueueHeader;
        let capacity = (*header).capacity as usize;
        let slots = base.add(size_of::<QueueHeader>()) as *mut Message;
        Self {
            header,
            slots,
            capacity,
        }
    }

    /// Size in bytes of one slot stride in memory.
    #[inline]
    pub fn slot_stride() -> usize {
        size_of::<Message>()
    }

    /// Total region size for a queue of `capacity` slots.
    pub fn region_size(capacity: usize) -> usize {
        size_of::<QueueHeader>() + capacity * Self::slot_stride()
    }

    pub fn header(&self) -> &QueueHeader {
        unsafe { &*self.header }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `msg` in the slot at `head`, advance `head`, and bump the
    /// counters. Returns the enqueue sequence number, counting from 1.
    ///
    /// The caller must hold the gate mutex (witnessed by `guard`) and
    /// have taken an empty-slot permit.
    pub fn write_at_head(&self, guard: &GateGuard<'_>, msg: &Message) -> u64 {
        let header = self.header();
        debug_assert!(std::ptr::eq(guard.gate(), &header.gate));

        let head = header.head.load(Relaxed) as usize;
        unsafe { ptr::write(self.slots.add(head), *msg) };

        header.head.store(((head + 1) % self.capacity) as u32, Relaxed);
        header.count.fetch_add(1, Relaxed);
        header.added_total.fetch_add(1, Relaxed) + 1
    }

    /// Copy the slot at `tail` out, advance `tail`, and bump the
    /// counters. Returns the message and its dequeue sequence number.
    ///
    /// The caller must hold the gate mutex (witnessed by `guard`) and
    /// have taken a full-slot permit.
    pub fn read_at_tail(&self, guard: &GateGuard<'_>) -> (Message, u64) {
        let header = self.header();
        debug_assert!(std::ptr::eq(guard.gate(), &header.gate));

        let tail = header.tail.load(Relaxed) as usize;
        let msg = unsafe { ptr::read(self.slots.add(tail)) };

        header.tail.store(((tail + 1) % self.capacity) as u32, Relaxed);
        header.count.fetch_sub(1, Relaxed);
        let seq = header.consumed_total.fetch_add(1, Relaxed) + 1;
        (msg, seq)
    }
}
