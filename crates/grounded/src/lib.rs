pub mod agent;
pub mod bootstrap;
pub mod configuration;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod ingest;
pub mod models;
pub mod prompt_template;
pub mod providers;
pub mod retrieval;
pub mod retry;
pub mod splitter;
pub mod store;
pub mod tools;
