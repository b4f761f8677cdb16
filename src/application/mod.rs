//! Application services layer.

pub mod admin_console;
pub mod calendar;
pub mod error;
pub mod repos;
pub mod revalidate;
