//! Domain layer types and invariants.

pub mod calendar;
pub mod error;
pub mod language;
pub mod promotions;
pub mod schedule;
