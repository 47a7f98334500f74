//! # Vehicle Sync Shared
//!
//! This crate defines shared data structures used across the vehicle sync ecosystem.
//! It includes the document shape that vehicle records take once they are resolved
//! for the search index.

pub mod types;

pub use types::vehicle_document::VehicleDocument;
