mod builder;
mod consumer;
mod producer;
mod ring_impl;

pub mod checksum;
pub mod layout;
pub mod ring;

pub use builder::{Queue, QueueBuilder, QueueStats, DEFAULT_CAPACITY};
pub use consumer::{Consumer, Delivery};
pub use layout::{Message, PAYLOAD_MAX, SIZE_MAX};
pub use producer::Producer;
pub use ring::RingBuffer; // re-export for stable path
