// Fixed-capacity circular buffer of message slots in a shared region

use super::layout::{Message, QueueHeader};

/// View over one shared queue region.
///
/// This struct is NOT stored in shared memory. It is a transient view
/// holding pointers into the mapped segment: the control header at the
/// start and the packed slot array right after it.
///
/// ### Concurrency Design
/// The ring itself is not thread safe. Every mutating call takes a
/// [`GateGuard`](crate::sys::sema::GateGuard) as witness that the
/// caller holds the gate mutex, and the gate's counting semaphores
/// guarantee a free (respectively occupied) slot before `write_at_head`
/// (respectively `read_at_tail`) runs. Under that discipline both
/// operations are O(1) and cannot fail.
pub struct RingBuffer {
    /// Pointer to the control header at the start of the region.
    pub(crate) header: *const QueueHeader,

    /// Pointer to the first of `capacity` packed slots.
    pub(crate) slots: *mut Message,

    /// Number of slots; cursors wrap modulo this.
    pub(crate) capacity: usize,
}

unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}
