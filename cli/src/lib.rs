//! NoOps CLI Library
//!
//! Deployment orchestration for the NoOps command-line client: stack file
//! upload, the brain's command poll loop and docker image pushes.

pub mod app;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod models;
pub mod storage;
pub mod utils;
pub mod workers;
