//! Turning text into dense vectors for similarity search.

pub mod base;
pub mod configs;
pub mod factory;
pub mod openai;
pub mod tei;
