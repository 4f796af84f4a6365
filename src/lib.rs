//! semq: a bounded message queue in shared memory, gated by a classic
//! three-semaphore protocol (one mutex, one empty-slot count, one
//! full-slot count).
//!
//! The queue is a fixed-capacity ring of fixed-size slots living in a
//! single region that independently scheduled workers map and mutate.
//! Any number of producers and consumers share the one ring and the
//! one gate; the gate's mutex serializes every mutation, so the queue
//! delivers messages in one global FIFO order.

pub mod queue;
pub mod sys;
pub mod worker;

pub use queue::{
    Consumer, Delivery, Message, Producer, Queue, QueueBuilder, QueueStats, DEFAULT_CAPACITY,
};
pub use worker::{consumer_loop, producer_loop, CancelToken, WorkerId};
