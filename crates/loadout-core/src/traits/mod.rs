//! Core traits for pluggable persistence.

pub mod kv;

pub use kv::KeyValueStore;
