//! Calendar data cache.
//!
//! Memoizes the four store reads behind a calendar month, keyed by
//! `(year, month)`, with a time-to-live and tag-based invalidation:
//!
//! - **Expiry**: entries older than `cache.ttl_seconds` are refetched lazily.
//! - **Tags**: every entry is registered under [`CALENDAR_DATA_TAG`];
//!   invalidating the tag drops all of them at once.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! ttl_seconds = 300
//! enable_response_cache = true
//! response_limit = 64
//! ```

mod clock;
mod config;
mod keys;
mod lock;
mod registry;
mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheConfig;
pub use keys::{CALENDAR_DATA_TAG, HOME_PATH};
pub use registry::TagRegistry;
pub use store::{CalendarData, CalendarDataCache};

pub(crate) use lock::{rw_read, rw_write};
