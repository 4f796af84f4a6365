pub mod futex;
pub mod sema;
pub mod shm;

pub use sema::{Gate, GateGuard, Semaphore};
pub use shm::{
    attach_segment, create_segment, heap_segment, unlink_segment, RawHandle, ShmBackend,
};
