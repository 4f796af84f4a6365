use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64};

use crate::queue::checksum;
use crate::sys::sema::Gate;

/// Size of the payload area in every slot.
pub const PAYLOAD_MAX: usize = 256;

/// Largest declared payload length; the `size` field is one byte.
pub const SIZE_MAX: usize = 255;

/// A "magic number" identifying a mapped region as a semq segment.
pub const MAGIC: u64 = 0x53454D51_42554631; // "SEMQBUF1"

/// Version of the shared layout below.
pub const LAYOUT_VERSION: u32 = 1;

/// One message, exactly as it sits in a slot.
///
/// This struct is the wire format of the shared channel:
/// `[kind:1][checksum:2][size:1][payload:256]`, 260 bytes per slot
/// regardless of the declared payload length. The checksum is kept as
/// two little-endian bytes so the record stays packed without
/// `repr(packed)`.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct Message {
    /// Application-defined type tag.
    pub kind: u8,

    /// Little-endian 16-bit checksum over `kind` and the declared payload.
    pub checksum: [u8; 2],

    /// Declared payload length in bytes.
    pub size: u8,

    /// Payload bytes; only the first `size` are meaningful.
    pub payload: [u8; PAYLOAD_MAX],
}

impl Message {
    /// Build a message and stamp its checksum.
    ///
    /// # Panics
    /// Panics if `data` is longer than [`SIZE_MAX`]. A zero-length
    /// payload is valid; its checksum covers the type byte alone.
    pub fn new(kind: u8, data: &[u8]) -> Self {
        assert!(
            data.len() <= SIZE_MAX,
            "declared payload length {} exceeds {}",
            data.len(),
            SIZE_MAX
        );

        let mut payload = [0u8; PAYLOAD_MAX];
        payload[..data.len()].copy_from_slice(data);

        Self {
            kind,
            checksum: checksum::compute(kind, data).to_le_bytes(),
            size: data.len() as u8,
            payload,
        }
    }

    /// The stored checksum, decoded.
    pub fn checksum(&self) -> u16 {
        u16::from_le_bytes(self.checksum)
    }

    /// The declared payload prefix.
    pub fn data(&self) -> &[u8] {
        &self.payload[..self.size as usize]
    }

    /// Recompute the checksum over the declared payload and compare it
    /// with the stored one. Bytes past `size` do not participate.
    pub fn verify(&self) -> bool {
        checksum::compute(self.kind, self.data()) == self.checksum()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("kind", &self.kind)
            .field("checksum", &format_args!("{:#06x}", self.checksum()))
            .field("size", &self.size)
            .finish()
    }
}

/// Control region at the start of the shared segment, followed
/// immediately by `capacity` packed [`Message`] slots.
///
/// The gate semaphores live here so every process mapping the segment
/// shares them. The cursors and counters are atomics only because the
/// region is mapped by several processes; they are mutated exclusively
/// under the gate mutex, which also provides the ordering.
#[repr(C, align(128))]
pub struct QueueHeader {
    pub magic: u64,
    pub version: u32,

    /// Number of slots following the header.
    pub capacity: u32,

    pub gate: Gate,

    /// Next slot a producer writes.
    pub head: AtomicU32,

    /// Next slot a consumer reads.
    pub tail: AtomicU32,

    /// Occupied slots; always `added_total - consumed_total`.
    pub count: AtomicU32,

    /// Messages ever enqueued.
    pub added_total: AtomicU64,

    /// Messages ever dequeued.
    pub consumed_total: AtomicU64,
}

impl QueueHeader {
    pub fn new(capacity: u32) -> Self {
        Self {
            magic: MAGIC,
            version: LAYOUT_VERSION,
            capacity,
            gate: Gate::new(capacity),
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            count: AtomicU32::new(0),
            added_total: AtomicU64::new(0),
            consumed_total: AtomicU64::new(0),
        }
    }
}
