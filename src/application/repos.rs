//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::promotions::{CalendarSettingsRecord, PromotionRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Read access to promotions and calendar settings.
///
/// Month arguments are 0-based. Rows sharing a sort key come back in
/// insertion order.
#[async_trait]
pub trait CalendarRepo: Send + Sync {
    /// Every recurring weekday default, ordered by weekday.
    async fn list_weekly_defaults(&self) -> Result<Vec<PromotionRecord>, RepoError>;

    /// Weekday overrides planned for `year`/`month`, ordered by weekday.
    async fn list_weekly_plan(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<PromotionRecord>, RepoError>;

    /// Active dated specials falling in `year`/`month`, ordered by day.
    async fn list_active_specials(
        &self,
        year: i32,
        month: i32,
    ) -> Result<Vec<PromotionRecord>, RepoError>;

    async fn load_calendar_settings(&self) -> Result<Option<CalendarSettingsRecord>, RepoError>;

    /// Whether any special promotion is active, regardless of date.
    async fn has_any_active_special(&self) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}
