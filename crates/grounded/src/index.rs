//! Nearest-neighbour search over embedded chunks.

pub mod base;
pub mod configs;
pub mod factory;
pub mod memory;
pub mod pinecone;
