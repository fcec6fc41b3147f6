//! Core types and trait definitions for the Cohort segmentation service.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement the traits in [`store`]; the
//! [`engine::SegmentationEngine`] orchestrates them.

pub mod assignment;
pub mod engine;
pub mod error;
pub mod segment;
pub mod store;

pub use engine::SegmentationEngine;
pub use error::{Error, Result};
