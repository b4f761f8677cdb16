//! On-demand cache invalidation.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::cache::{CALENDAR_DATA_TAG, CalendarDataCache, HOME_PATH};
use crate::infra::cache::ResponseCache;

#[derive(Debug, Error)]
pub enum InvalidationError {
    #[error("unknown revalidation tag `{0}`")]
    UnknownTag(String),
    #[error("revalidation path `{0}` must start with `/`")]
    InvalidPath(String),
    #[error("cache backend failed: {0}")]
    Backend(String),
}

/// The two invalidation primitives the admin endpoint relies on.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    /// Drop every data-cache entry registered under `tag`.
    async fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError>;

    /// Mark rendered output for `path` stale.
    async fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError>;
}

/// Invalidator backed by the process-local caches.
#[derive(Clone)]
pub struct Revalidator {
    data: Arc<CalendarDataCache>,
    responses: Option<ResponseCache>,
}

impl Revalidator {
    pub fn new(data: Arc<CalendarDataCache>, responses: Option<ResponseCache>) -> Self {
        Self { data, responses }
    }
}

#[async_trait]
impl CacheInvalidator for Revalidator {
    async fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError> {
        if !self.data.declares_tag(tag) {
            return Err(InvalidationError::UnknownTag(tag.to_string()));
        }
        self.data.invalidate_tag(tag);
        Ok(())
    }

    async fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError> {
        if !path.starts_with('/') {
            return Err(InvalidationError::InvalidPath(path.to_string()));
        }
        if let Some(responses) = &self.responses {
            responses.invalidate_path(path);
        }
        Ok(())
    }
}

/// Invalidate the calendar data tag, then the rendered home page.
///
/// Stops at the first failure.
pub async fn clear_calendar_cache(
    invalidator: &dyn CacheInvalidator,
) -> Result<(), InvalidationError> {
    invalidator.invalidate_tag(CALENDAR_DATA_TAG).await?;
    invalidator.invalidate_path(HOME_PATH).await?;
    info!(tag = CALENDAR_DATA_TAG, path = HOME_PATH, "Calendar cache cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use time::macros::datetime;

    use super::*;
    use crate::application::repos::{CalendarRepo, RepoError};
    use crate::cache::{CacheConfig, ManualClock};
    use crate::domain::calendar::YearMonth;
    use crate::domain::promotions::{CalendarSettingsRecord, PromotionRecord};

    struct EmptyRepo;

    #[async_trait]
    impl CalendarRepo for EmptyRepo {
        async fn list_weekly_defaults(&self) -> Result<Vec<PromotionRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_weekly_plan(
            &self,
            _year: i32,
            _month: i32,
        ) -> Result<Vec<PromotionRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn list_active_specials(
            &self,
            _year: i32,
            _month: i32,
        ) -> Result<Vec<PromotionRecord>, RepoError> {
            Ok(Vec::new())
        }

        async fn load_calendar_settings(
            &self,
        ) -> Result<Option<CalendarSettingsRecord>, RepoError> {
            Ok(None)
        }

        async fn has_any_active_special(&self) -> Result<bool, RepoError> {
            Ok(false)
        }
    }

    #[derive(Default)]
    struct RecordingInvalidator {
        calls: Mutex<Vec<String>>,
        fail_tag: bool,
    }

    #[async_trait]
    impl CacheInvalidator for RecordingInvalidator {
        async fn invalidate_tag(&self, tag: &str) -> Result<(), InvalidationError> {
            self.calls.lock().expect("calls lock").push(format!("tag:{tag}"));
            if self.fail_tag {
                return Err(InvalidationError::Backend("unavailable".to_string()));
            }
            Ok(())
        }

        async fn invalidate_path(&self, path: &str) -> Result<(), InvalidationError> {
            self.calls.lock().expect("calls lock").push(format!("path:{path}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn clears_tag_then_home_path() {
        let invalidator = RecordingInvalidator::default();
        clear_calendar_cache(&invalidator).await.expect("cleared");
        assert_eq!(
            *invalidator.calls.lock().expect("calls lock"),
            vec!["tag:calendar-calendar-data".to_string(), "path:/".to_string()]
        );
    }

    #[tokio::test]
    async fn tag_failure_skips_path_invalidation() {
        let invalidator = RecordingInvalidator {
            fail_tag: true,
            ..RecordingInvalidator::default()
        };
        assert!(clear_calendar_cache(&invalidator).await.is_err());
        assert_eq!(invalidator.calls.lock().expect("calls lock").len(), 1);
    }

    fn revalidator() -> (Arc<CalendarDataCache>, Revalidator) {
        let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 00:00 UTC)));
        let data = Arc::new(CalendarDataCache::new(
            Arc::new(EmptyRepo),
            clock.clone(),
            &CacheConfig::default(),
        ));
        let responses = ResponseCache::new(clock, &CacheConfig::default());
        (data.clone(), Revalidator::new(data, Some(responses)))
    }

    #[tokio::test]
    async fn revalidator_empties_the_data_cache() {
        let (data, revalidator) = revalidator();
        data.get(YearMonth { year: 2024, month: 0 })
            .await
            .expect("populate");
        assert_eq!(data.len(), 1);

        clear_calendar_cache(&revalidator).await.expect("cleared");
        assert!(data.is_empty());
    }

    #[tokio::test]
    async fn revalidator_rejects_unknown_tags_and_relative_paths() {
        let (_data, revalidator) = revalidator();
        assert!(matches!(
            revalidator.invalidate_tag("posts").await,
            Err(InvalidationError::UnknownTag(_))
        ));
        assert!(matches!(
            revalidator.invalidate_path("home").await,
            Err(InvalidationError::InvalidPath(_))
        ));
    }
}
