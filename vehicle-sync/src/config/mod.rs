//! Configuration module for the vehicle sync.

mod dependencies;

pub use dependencies::{ConnectionMode, Dependencies, SyncConfig};
