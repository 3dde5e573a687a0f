//! quizforge-core — Quiz authoring validation and attempt scoring.
//!
//! This crate defines the data model, the per-type question policy, the
//! composition validator, the authorization guard and the scoring engine
//! that the rest of quizforge builds on. Persistence is reached only
//! through the [`traits::QuizStore`] trait.

pub mod auth;
pub mod error;
pub mod model;
pub mod parser;
pub mod policy;
pub mod report;
pub mod scoring;
pub mod service;
pub mod traits;
pub mod validate;

pub use error::{QuizError, StoreError, ValidationError};
pub use scoring::AttemptEngine;
pub use service::QuizService;
pub use traits::QuizStore;
