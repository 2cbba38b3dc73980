//! Long-running loops

pub mod poller;
