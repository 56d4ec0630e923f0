//! panel-schema
//!
//! Pure schema models for dynamic forms and rate matrices (fields, sections,
//! headers, cells). No I/O, no rendering. Only data types and core enums.

pub mod common;
pub mod field;
pub mod form;
pub mod matrix;

pub use common::*;
pub use field::*;
pub use form::*;
pub use matrix::*;
