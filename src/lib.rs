//! Server-rendered promotional calendar.
//!
//! Weekly promotions and dated specials are composed into a month grid per
//! request, backed by a tag-invalidated data cache and an admin endpoint that
//! clears it.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod presentation;
pub mod util;
