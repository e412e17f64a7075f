//! Core domain types and logic.

pub mod artifact;
pub mod bar;
pub mod classifier;
pub mod config_validation;
pub mod error;
pub mod literal;
pub mod lookup;
pub mod reconcile;
pub mod scan;
pub mod store;
pub mod verify;
