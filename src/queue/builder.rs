use std::fmt;
use std::io;
use std::mem::size_of;
use std::ptr;
use std::sync::atomic::Ordering::Relaxed;
use std::sync::Arc;

use super::layout::{QueueHeader, LAYOUT_VERSION, MAGIC};
use super::ring::RingBuffer;
use super::{Consumer, Producer};
use crate::sys::shm::{self, ShmBackend};

/// Capacity used when the builder is not given one.
pub const DEFAULT_CAPACITY: usize = 10;

/// Builder for creating or attaching to a queue segment.
///
/// The process that owns the queue calls [`create`](Self::create) (or
/// [`create_private`](Self::create_private) when all workers are
/// threads of one process) exactly once before any worker starts;
/// other processes call [`attach`](Self::attach) with the same name.
pub struct QueueBuilder {
    name: String,
    capacity: usize,
}

impl QueueBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Create and zero-initialize a named shared segment for this queue.
    ///
    /// Fatal on any resource failure; nothing is spawned or half-built.
    /// The returned queue owns the name and unlinks it on drop.
    pub fn create(self) -> io::Result<Queue> {
        self.validate_capacity()?;
        let size = RingBuffer::region_size(self.capacity);
        let shm = shm::create_segment(&self.name, size).map_err(|e| {
            io::Error::new(
                e.kind(),
                format!("Failed to create queue segment '{}': {}", self.name, e),
            )
        })?;
        Ok(Self::init_region(shm, self.capacity, Some(self.name), true))
    }

    /// Create a queue in process-private memory.
    ///
    /// Same layout and protocol as the named variant; reachable only by
    /// threads holding a clone of the returned handle.
    pub fn create_private(self) -> io::Result<Queue> {
        self.validate_capacity()?;
        let shm = shm::heap_segment(RingBuffer::region_size(self.capacity))?;
        Ok(Self::init_region(shm, self.capacity, None, false))
    }

    /// Attach to a queue segment created by another process.
    ///
    /// The capacity comes from the segment header; the builder's own
    /// capacity setting is ignored. The header magic, version, and
    /// region size are all validated before the queue is usable.
    pub fn attach(self) -> io::Result<Queue> {
        let shm = shm::attach_segment(&self.name, size_of::<QueueHeader>())?;

        let header = shm.as_ptr() as *const QueueHeader;
        unsafe {
            if (*header).magic != MAGIC {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Segment '{}' is not a semq queue", self.name),
                ));
            }
            if (*header).version != LAYOUT_VERSION {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Segment '{}' has layout version {}, expected {}",
                        self.name,
                        (*header).version,
                        LAYOUT_VERSION
                    ),
                ));
            }
            let capacity = (*header).capacity as usize;
            if shm.size() < RingBuffer::region_size(capacity) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Segment '{}' is truncated: {} slots do not fit in {} bytes",
                        self.name,
                        capacity,
                        shm.size()
                    ),
                ));
            }
        }

        let ring = unsafe { RingBuffer::new(shm.as_ptr()) };
        Ok(Queue {
            shm,
            ring,
            name: Some(self.name),
            owner: false,
        })
    }

    fn validate_capacity(&self) -> io::Result<()> {
        if self.capacity == 0 || self.capacity > u32::MAX as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Queue capacity {} is out of range", self.capacity),
            ));
        }
        Ok(())
    }

    fn init_region(
        shm: Box<dyn ShmBackend>,
        capacity: usize,
        name: Option<String>,
        owner: bool,
    ) -> Queue {
        // The fresh mapping is already zeroed, so the slot array needs
        // no touch; only the header is written.
        unsafe {
            ptr::write(
                shm.as_ptr() as *mut QueueHeader,
                QueueHeader::new(capacity as u32),
            );
        }
        let ring = unsafe { RingBuffer::new(shm.as_ptr()) };
        Queue {
            shm,
            ring,
            name,
            owner,
        }
    }
}

/// Consistent snapshot of the queue counters, taken under the gate mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub capacity: usize,
    pub count: usize,
    pub added_total: u64,
    pub consumed_total: u64,
}

impl QueueStats {
    pub fn free(&self) -> usize {
        self.capacity - self.count
    }
}

/// Handle to one queue region, created or attached via [`QueueBuilder`].
///
/// Clonable endpoints are derived from it through
/// [`producer`](Self::producer) and [`consumer`](Self::consumer); all
/// endpoints of all processes operate on the same slots and the same
/// gate. The owning handle unlinks the named segment when dropped.
pub struct Queue {
    shm: Box<dyn ShmBackend>,
    ring: RingBuffer,
    name: Option<String>,
    owner: bool,
}

impl Queue {
    /// A sending endpoint for this queue.
    pub fn producer(self: &Arc<Self>) -> Producer {
        Producer::new(Arc::clone(self))
    }

    /// A receiving endpoint for this queue.
    pub fn consumer(self: &Arc<Self>) -> Consumer {
        Consumer::new(Arc::clone(self))
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Segment name, if the queue is backed by a named segment.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Snapshot `{count, added_total, consumed_total}` under the mutex.
    ///
    /// Reading without the mutex could observe a half-updated cursor
    /// pair, so even diagnostics go through the gate.
    pub fn stats(&self) -> QueueStats {
        let header = self.ring.header();
        let _guard = header.gate.lock();
        QueueStats {
            capacity: self.ring.capacity(),
            count: header.count.load(Relaxed) as usize,
            added_total: header.added_total.load(Relaxed),
            consumed_total: header.consumed_total.load(Relaxed),
        }
    }

    pub(crate) fn ring(&self) -> &RingBuffer {
        &self.ring
    }

    pub(crate) fn header(&self) -> &QueueHeader {
        self.ring.header()
    }
}

impl fmt::Debug for Queue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("name", &self.name)
            .field("capacity", &self.ring.capacity())
            .field("owner", &self.owner)
            .field("region", &format_args!("{:p}", self.shm.as_ptr()))
            .finish()
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        if self.owner {
            if let Some(name) = &self.name {
                // Existing mappings in other processes stay valid.
                if let Err(e) = shm::unlink_segment(name) {
                    log::debug!("could not unlink queue segment '{}': {}", name, e);
                }
            }
        }
    }
}
