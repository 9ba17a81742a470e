//! Core types, store traits and the inference engine for Pakar.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; storage backends implement the traits in
//! [`store`], and the engine in [`engine`] only ever talks to those traits.

pub mod category;
pub mod characteristic;
pub mod consultation;
pub mod engine;
pub mod error;
pub mod recommendation;
pub mod rule;
pub mod status;
pub mod store;
pub mod subject;

pub use error::{EntityKind, Error, Result};
