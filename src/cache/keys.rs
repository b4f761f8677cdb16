//! Names shared by the cache and its invalidation callers.

/// Revalidation tag covering every cached calendar month.
pub const CALENDAR_DATA_TAG: &str = "calendar-calendar-data";

/// Path of the rendered calendar page.
pub const HOME_PATH: &str = "/";
