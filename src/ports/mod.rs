//! Port traits: the seams between domain logic and I/O.

pub mod artifact_port;
pub mod config_port;
pub mod report_port;
