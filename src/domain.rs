//! Domain models for the module store.
//!
//! This module contains the core domain types including locations, content
//! descriptors, node classes and configuration.

/// Location identifiers and slug cleaning.
pub mod location;
pub use location::{Location, LocationError, PartialLocation, clean};

mod descriptor;
pub use descriptor::Descriptor;

pub mod class;
pub use class::{ClassRegistry, ClassResolver, DescriptorClass, NodeSource};

mod config;
pub use config::{CONFIG_FILE, Config};
