//! Domain layer types and invariants.

pub mod accounts;
pub mod entities;
pub mod error;
pub mod images;
