//! Futex-backed counting semaphores and the gate protecting the queue.

use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};

use crossbeam_utils::CachePadded;

use super::futex::{futex_wait, futex_wake};

/// A counting semaphore whose permit count is a single futex word.
///
/// The struct is `#[repr(C)]` so it can live inside a shared memory
/// segment and be operated on by any process mapping that segment.
/// `acquire` blocks in the kernel while the count is zero; a wait
/// interrupted by a signal simply re-enters the permit check, so an
/// interruption is never visible to callers.
#[repr(C)]
pub struct Semaphore {
    value: AtomicU32,
}

impl Semaphore {
    pub const fn new(permits: u32) -> Self {
        Self {
            value: AtomicU32::new(permits),
        }
    }

    /// Take one permit, sleeping until one is available.
    pub fn acquire(&self) {
        loop {
            let mut current = self.value.load(Relaxed);
            while current > 0 {
                match self
                    .value
                    .compare_exchange_weak(current, current - 1, Acquire, Relaxed)
                {
                    Ok(_) => return,
                    Err(observed) => current = observed,
                }
            }
            // Sleeps only while the count is still zero.
            futex_wait(&self.value, 0);
        }
    }

    /// Take one permit without blocking. Returns false if none is available.
    pub fn try_acquire(&self) -> bool {
        let mut current = self.value.load(Relaxed);
        while current > 0 {
            match self
                .value
                .compare_exchange_weak(current, current - 1, Acquire, Relaxed)
            {
                Ok(_) => return true,
                Err(observed) => current = observed,
            }
        }
        false
    }

    /// Return one permit and wake a single sleeping waiter, if any.
    pub fn release(&self) {
        self.value.fetch_add(1, Release);
        futex_wake(&self.value);
    }

    /// Current permit count. Racy by nature; diagnostics only.
    pub fn permits(&self) -> u32 {
        self.value.load(Relaxed)
    }
}

/// The three-semaphore gate around the ring buffer.
///
/// ### Protocol
/// - Writer side: `empty_slots.acquire()`, `lock()`, write at head,
///   drop the guard, `full_slots.release()`.
/// - Reader side: `full_slots.acquire()`, `lock()`, read at tail,
///   drop the guard, `empty_slots.release()`.
///
/// Because every buffer mutation runs under the single `mutex`, the
/// write and read operations across all workers form one total order
/// and the buffer behaves as a single FIFO channel. Which producer or
/// consumer wins a given permit is scheduler dependent and must not be
/// relied on.
#[repr(C)]
pub struct Gate {
    /// Binary semaphore admitting at most one buffer mutator.
    mutex: CachePadded<Semaphore>,
    /// Counts free slots; starts at the buffer capacity.
    empty_slots: CachePadded<Semaphore>,
    /// Counts occupied slots; starts at zero.
    full_slots: CachePadded<Semaphore>,
}

impl Gate {
    pub fn new(capacity: u32) -> Self {
        Self {
            mutex: CachePadded::new(Semaphore::new(1)),
            empty_slots: CachePadded::new(Semaphore::new(capacity)),
            full_slots: CachePadded::new(Semaphore::new(0)),
        }
    }

    /// Enter the critical section. The guard releases the mutex on drop.
    pub fn lock(&self) -> GateGuard<'_> {
        self.mutex.acquire();
        GateGuard { gate: self }
    }

    pub fn empty_slots(&self) -> &Semaphore {
        &self.empty_slots
    }

    pub fn full_slots(&self) -> &Semaphore {
        &self.full_slots
    }
}

/// Witness that the calling thread holds the gate mutex.
pub struct GateGuard<'a> {
    gate: &'a Gate,
}

impl GateGuard<'_> {
    pub(crate) fn gate(&self) -> &Gate {
        self.gate
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.mutex.release();
    }
}
