//! Wire models for the NoOps orchestrator ("the brain") API.

pub mod models;

pub use models::*;
