//! Port traits: the engine's view of its collaborators.

pub mod broker_port;
pub mod config_port;
pub mod feed_port;
pub mod report_port;
