//! MediSupply Market
//!
//! B2B marketplace for medical supplies: sellers list drugs and equipment in
//! batches, buyers fill carts that are allocated against those batches, and
//! orders move through a seller/buyer workflow with payments, ratings, chat
//! and notifications around it.
//!
//! ## Layout
//! - [`store`] - document store seam with memory and Postgres backends
//! - [`domain`] - aggregates, batch allocation and domain events
//! - [`services`] - marketplace operations on top of the store
//! - [`api`] - axum router exposing the services over HTTP

pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod store;

pub use error::{MarketError, Result};
pub use services::Marketplace;
