//! These models represent the objects passed around by the agent
//!
//! There are a few related formats we need to interact with:
//! - openai-compatible messages/tools, sent from the agent to the LLM
//! - stored conversation history, persisted line by line by the stores
//! - tool calls, dispatched from the agent to the retrieval tool
//!
//! We always immediately convert the provider formats into these internal structs
//! using to/from helpers in `providers::utils`.
pub mod message;
pub mod role;
pub mod tool;
