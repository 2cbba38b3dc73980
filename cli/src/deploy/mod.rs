//! Deployment module

pub mod dispatcher;
pub mod docker;
pub mod fsm;
pub mod initiator;
pub mod pusher;
pub mod upload;
