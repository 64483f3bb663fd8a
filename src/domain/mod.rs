//! Marketplace domain: aggregates, value objects, batch allocation and events.
pub mod aggregates;
pub mod allocation;
pub mod events;
pub mod value_objects;
