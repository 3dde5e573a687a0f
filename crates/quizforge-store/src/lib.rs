//! quizforge-store — Persistence for quizforge.
//!
//! Implements the `QuizStore` trait with a transactional in-memory store
//! that can be snapshotted to JSON, and loads the quizforge configuration.

pub mod config;
pub mod memory;

pub use config::{load_config, open_store, QuizforgeConfig};
pub use memory::{MemoryStore, Tables};
