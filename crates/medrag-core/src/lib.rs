//! medrag-core
//!
//! Shared vocabulary for the retrieval workspace: chunk and result types, the
//! store/model traits, stage-labelled errors, configuration and the shared
//! model cache.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;
pub mod types;

pub use error::{Error, Result, RetrievalError, Stage};
