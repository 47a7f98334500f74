//! This module defines the core data structures used across the vehicle sync.
//! It re-exports specific types like `VehicleDocument`.

pub mod vehicle_document;

pub use vehicle_document::VehicleDocument;
