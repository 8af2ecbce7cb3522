//! Per-thread conversation history.

pub mod base;
pub mod configs;
pub mod factory;
pub mod jsonl;
pub mod memory;
